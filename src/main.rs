use std::sync::Arc;

use archive_bot::config::Config;
use archive_bot::transport::telegram::{self, TelegramClient};
use dotenvy::dotenv;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "archive_bot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting PDF archive bot...");

    let config = Config::from_env()?;
    config.ensure_dest_dir()?;
    info!(
        "🗄️  Destination: {} | {} allowed user(s) | {} keyring password(s)",
        config.dest_dir.display(),
        config.allowed_users.len(),
        config.passwords.len()
    );

    let client = Arc::new(TelegramClient::new(&config.token));
    let router = Arc::new(archive_bot::build_router(
        &config,
        client.clone(),
        client.clone(),
    ));

    // Setup Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let poller = tokio::spawn(telegram::run_polling(client, router, shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    let _ = poller.await;

    info!("🛑 Bot shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
