use std::sync::Arc;

use anyhow::Context;
use choreroom::{app, auth::LogMailer, config::Config, db, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,choreroom=debug")),
        )
        .init();

    let config = Config::load()?;

    info!("Opening {}", config.database_url);
    let db_pool = db::connect(&config.database_url)
        .await
        .context("opening database")?;

    let address = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(db_pool, config, Arc::new(LogMailer));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
