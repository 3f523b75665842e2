//! # pulse-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment:
//! `PORT`, `AUTH_TOKEN`, `SITE_URL`, `GUEST_INVITE_TTL_HOURS`,
//! `DATABASE_URL`, `MAIL_*`, `RUST_LOG` and `LOG_FORMAT` (`json` or text).

use std::sync::Arc;

use pulse_api::state::{AppConfig, AppState};
use pulse_mail::{ConfigError, HttpMailer, LogMailer, MailConfig, Mailer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    let port = config.port;

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = pulse_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let mailer: Arc<dyn Mailer> = match MailConfig::from_env() {
        Ok(mail_config) => {
            let mailer = HttpMailer::new(&mail_config).map_err(|e| {
                tracing::error!("Failed to create mail client: {e}");
                e
            })?;
            tracing::info!(api_url = %mail_config.api_url, "HTTP mailer configured");
            Arc::new(mailer)
        }
        Err(ConfigError::MissingApiKey) => {
            tracing::warn!("MAIL_API_KEY not set. Emails will be logged, not delivered.");
            Arc::new(LogMailer)
        }
        Err(e) => {
            tracing::error!("Invalid mail configuration: {e}");
            return Err(e.into());
        }
    };

    tracing::info!(config = ?config, "configuration loaded");
    let state = AppState::with_config(config, mailer, db_pool);

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = pulse_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Pulse API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Pulse API stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
