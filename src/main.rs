//! Taskboard server.
//!
//! ```bash
//! JWT_SECRET=change-me cargo run --bin taskboard
//!
//! # Local development: ephemeral secret, permissive CORS
//! DEV_MODE=true cargo run --bin taskboard
//! ```

use anyhow::Context;
use taskboard::{api, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    // RUST_LOG wins over LOG_LEVEL.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if config.auth.ephemeral_secret {
        tracing::warn!("JWT_SECRET not set; using an ephemeral secret (dev mode)");
    }

    tracing::info!(
        addr = %config.bind_addr(),
        database = %config.database_path.display(),
        dev_mode = config.dev_mode,
        "starting taskboard"
    );

    api::serve(config).await
}
