use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::handlers::MessageHandler;

/// Telegram update payload (the subset the bot reads)
#[derive(Debug, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<Sender>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// Route one update to the message handler. Non-text updates are ignored.
pub async fn handle_update(handler: &MessageHandler, update: Update) -> anyhow::Result<()> {
    let Some(message) = update.message else {
        log::debug!("Skipping update {} without a message", update.update_id);
        return Ok(());
    };

    let Some(sender) = message.from else {
        log::debug!("Skipping message {} without a sender", message.message_id);
        return Ok(());
    };

    if sender.is_bot {
        return Ok(());
    }

    match message.text {
        Some(text) => handler.handle_message(sender.id, message.chat.id, &text).await,
        None => {
            log::debug!("Skipping non-text message {} from {}", message.message_id, sender.id);
            Ok(())
        }
    }
}

// Axum integration (optional - requires axum dependency)
#[cfg(feature = "webhook-server")]
pub mod server {
    use super::*;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Router,
    };

    const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

    pub struct AppState {
        pub message_handler: Arc<MessageHandler>,
        pub secret_token: Option<String>,
    }

    pub fn create_webhook_router(
        message_handler: Arc<MessageHandler>,
        secret_token: Option<String>,
    ) -> Router {
        let state = Arc::new(AppState {
            message_handler,
            secret_token,
        });

        Router::new()
            .route("/", get(root_handler))
            .route("/webhook/telegram", post(webhook_handler))
            .route("/health", get(health_check))
            .with_state(state)
    }

    fn secret_matches(headers: &HeaderMap, expected: Option<&str>) -> bool {
        match expected {
            None => true,
            Some(expected) => headers
                .get(SECRET_HEADER)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|provided| provided == expected),
        }
    }

    async fn webhook_handler(
        headers: HeaderMap,
        State(state): State<Arc<AppState>>,
        body: String,
    ) -> StatusCode {
        if !secret_matches(&headers, state.secret_token.as_deref()) {
            log::error!("❌ Webhook secret token mismatch");
            return StatusCode::UNAUTHORIZED;
        }

        let update: Update = match serde_json::from_str(&body) {
            Ok(update) => update,
            Err(e) => {
                log::error!("❌ Failed to parse webhook payload: {}", e);
                return StatusCode::UNPROCESSABLE_ENTITY;
            }
        };

        let update_id = update.update_id;
        if let Err(e) = handle_update(&state.message_handler, update).await {
            // Telegram redelivers on non-2xx, which would double-book intake
            log::error!("❌ Webhook processing error for update {}: {}", update_id, e);
        }

        StatusCode::OK
    }

    async fn root_handler() -> &'static str {
        "Calorie Tracker Bot Webhook Server - Use /webhook/telegram for Telegram updates"
    }

    async fn health_check() -> &'static str {
        "OK"
    }

}
