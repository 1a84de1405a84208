use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize};

use super::ChatService;
use crate::webhook::Update;

/// Telegram Bot API client
pub struct TelegramClient {
    token: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
}

impl TelegramClient {
    pub fn new(token: String, api_base: String) -> Self {
        Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut request = self.client.post(self.api_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // without_url: the request URL contains the bot token
        let response = request.send().await.map_err(|e| e.without_url())?;
        let status = response.status();
        let api: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("Telegram {} returned an unreadable body (HTTP {})", method, status))?;

        if !api.ok {
            anyhow::bail!(
                "Telegram {} failed (HTTP {}): {}",
                method,
                status,
                api.description.unwrap_or_default()
            );
        }

        api.result
            .with_context(|| format!("Telegram {} returned no result", method))
    }

    /// Check the token and return the bot's own identity.
    pub async fn get_me(&self) -> Result<BotIdentity> {
        self.call("getMe", &serde_json::json!({}), None).await
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });

        // HTTP timeout must outlive the server-side long poll
        let http_timeout = Duration::from_secs(timeout_secs + 10);
        self.call("getUpdates", &body, Some(http_timeout)).await
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        let body = serde_json::json!({ "drop_pending_updates": drop_pending_updates });
        let _: bool = self.call("deleteWebhook", &body, None).await?;
        Ok(())
    }

    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({
            "url": url,
            "allowed_updates": ["message"],
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = serde_json::Value::String(secret.to_string());
        }

        let _: bool = self.call("setWebhook", &body, None).await?;
        Ok(())
    }
}

fn reply_keyboard(rows: &[&[&str]]) -> serde_json::Value {
    let keyboard: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|label| serde_json::json!({ "text": label }))
                .collect()
        })
        .collect();

    serde_json::json!({
        "keyboard": keyboard,
        "resize_keyboard": true,
        "one_time_keyboard": false,
    })
}

#[async_trait::async_trait]
impl ChatService for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let _: serde_json::Value = self.call("sendMessage", &body, None).await?;
        Ok(())
    }

    async fn send_message_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &[&[&str]],
    ) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": reply_keyboard(keyboard),
        });

        let _: serde_json::Value = self.call("sendMessage", &body, None).await?;
        Ok(())
    }
}
