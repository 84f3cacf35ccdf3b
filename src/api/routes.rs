//! Router assembly and server lifecycle.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderValue,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::types::HealthResponse;
use super::{auth, boards, tasks, users};
use crate::config::Config;
use crate::db::Database;
use crate::events::EventHub;
use crate::service::BoardService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub service: Arc<BoardService>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        let service = BoardService::new(
            Arc::new(db),
            Arc::new(EventHub::default()),
            config.auth.password_iterations,
        );
        Self {
            config,
            service: Arc::new(service),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .nest("/api/boards", boards::routes())
        .nest("/api/tasks", tasks::routes())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database_path)?;
    let state = Arc::new(AppState::new(config.clone(), db));
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    match config.cors_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS_ORIGIN {:?}: {}", origin, e);
                CorsLayer::new()
            }
        },
        None if config.dev_mode => CorsLayer::permissive(),
        None => CorsLayer::new(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dev_mode: state.config.dev_mode,
    })
}
