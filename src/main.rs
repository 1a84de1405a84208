mod config;
mod errors;
mod handlers;
mod models;
mod polling;
mod services;
mod webhook; // Telegram update payloads + optional webhook server

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::task::JoinHandle;

use config::Config;
use handlers::MessageHandler;
use services::{Catalog, ChatService, Database, Ledger, TelegramClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG from .env applies
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("🚀 Starting Calorie Tracker Bot...");

    // Missing BOT_TOKEN ends the process here with a non-zero exit code
    let config = Config::from_env()?;

    let db = Arc::new(
        Database::new(&config.database_url, config.database_max_connections)
            .await
            .with_context(|| format!("failed to open database {}", config.database_url))?,
    );
    log::info!("✅ SQLite database initialized: {}", config.database_url);

    let catalog = Arc::new(Catalog::new(db.clone()));
    catalog.seed_defaults().await?;
    log::info!("✅ Product catalog ready ({} products)", catalog.products().await?.len());

    let ledger = Arc::new(Ledger::new(db.clone()));

    let telegram = Arc::new(TelegramClient::new(
        config.bot_token.clone(),
        config.telegram_api_url.clone(),
    ));
    let me = telegram.get_me().await.context("Telegram rejected BOT_TOKEN")?;
    log::info!(
        "✅ Telegram service initialized: @{} (id {})",
        me.username.as_deref().unwrap_or("unknown"),
        me.id
    );

    let chat = telegram.clone() as Arc<dyn ChatService>;
    let message_handler = Arc::new(MessageHandler::new(ledger, catalog, chat));
    log::info!("✅ Message handler initialized");

    let mut transport = start_transport(&config, telegram, message_handler).await?;

    log::info!("🎉 Bot is ready!");

    tokio::select! {
        result = shutdown_signal() => {
            result?;
            log::info!("🛑 Shutting down...");
        }
        _ = &mut transport => {
            log::error!("❌ Update transport stopped unexpectedly");
        }
    }

    // In-flight updates are not drained
    transport.abort();
    db.close().await;

    Ok(())
}

async fn start_transport(
    config: &Config,
    telegram: Arc<TelegramClient>,
    message_handler: Arc<MessageHandler>,
) -> Result<JoinHandle<()>> {
    #[cfg(feature = "webhook-server")]
    if let Some(webhook_config) = &config.webhook {
        use webhook::server::create_webhook_router;

        let listener = tokio::net::TcpListener::bind(&webhook_config.listen_addr)
            .await
            .with_context(|| format!("failed to bind webhook server on {}", webhook_config.listen_addr))?;

        telegram
            .set_webhook(&webhook_config.public_url, webhook_config.secret_token.as_deref())
            .await?;

        let app = create_webhook_router(message_handler, webhook_config.secret_token.clone());
        log::info!("🌐 Webhook server listening on {}", webhook_config.listen_addr);

        return Ok(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("❌ Webhook server failed: {}", e);
            }
        }));
    }

    #[cfg(not(feature = "webhook-server"))]
    if config.webhook.is_some() {
        log::warn!("⚠️ WEBHOOK_URL is set but the webhook-server feature is disabled, falling back to polling");
    }

    // Updates queued while the bot was offline are dropped
    telegram.delete_webhook(true).await?;
    log::info!("📡 Long polling started (timeout {}s)", config.poll_timeout_secs);

    let timeout_secs = config.poll_timeout_secs;
    Ok(tokio::spawn(polling::run_polling(telegram, message_handler, timeout_secs)))
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => log::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
