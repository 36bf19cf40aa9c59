//! # TaskDash API Server
//!
//! JSON backend for the TaskDash dashboard.
//!
//! ## Startup
//!
//! 1. Tracing (`RUST_LOG`, `LOG_FORMAT=json`)
//! 2. Configuration from the environment (`.env` honored)
//! 3. Database pool and migrations
//! 4. Bootstrap administrator, if configured
//! 5. HTTP server with graceful shutdown on Ctrl-C / SIGTERM
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskdash-api
//! ```

use std::sync::Arc;
use taskdash_api::{
    app::{build_router, ensure_bootstrap_admin, AppState},
    config::Config,
    mail::mailer_from_config,
};
use taskdash_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("TaskDash API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!(
        environment = ?config.api.environment,
        bind = %config.bind_address(),
        "Configuration loaded"
    );

    let pool = create_pool(DatabaseConfig::from_url(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await?;

    run_migrations(&pool).await?;
    ensure_bootstrap_admin(&pool, &config).await?;

    let mailer = mailer_from_config(&config.mail)?;
    let bind_address = config.bind_address();

    let state = AppState::new(pool.clone(), config, Arc::from(mailer));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskdash_api=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
