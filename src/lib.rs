//! # Taskboard
//!
//! A multi-board kanban tracker. Users own boards, share them with other
//! users, and arrange tasks across three fixed columns by drag and drop.
//!
//! ## Move Flow
//! 1. A drag gesture arrives as a [`task::MoveDescriptor`]
//! 2. [`task::plan_move`] reorders the affected columns and reports the
//!    minimal set of `(status, rank)` changes
//! 3. [`service::BoardService`] persists the changes in one transaction
//! 4. [`events::EventHub`] notifies the board's other viewers
//!
//! ## Modules
//! - `task`: task types and the pure ordering engine
//! - `board`: boards, users and share grants
//! - `access`: owner/grantee authorization
//! - `db`: SQLite persistence
//! - `service`: authorized, event-publishing operations
//! - `sync`: optimistic client session over a `TaskStore`
//! - `api`: HTTP surface

pub mod access;
pub mod api;
pub mod board;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod events;
pub mod service;
pub mod sync;
pub mod task;

pub use config::Config;
pub use error::{BoardError, BoardResult};
pub use service::BoardService;
pub use sync::{BoardSession, TaskStore};
