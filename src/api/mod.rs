//! HTTP API.
//!
//! JSON over axum. All routes except health, register and login sit behind
//! the bearer-token middleware in [`auth`].

mod auth;
mod boards;
mod events;
mod routes;
mod tasks;
pub mod types;
mod users;

pub use auth::AuthUser;
pub use routes::{build_router, serve, AppState};
