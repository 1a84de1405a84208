use anyhow::{Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite://bju_bot.db";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_WEBHOOK_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub telegram_api_url: String,
    pub poll_timeout_secs: u64,
    pub webhook: Option<WebhookConfig>,
}

/// Present only when WEBHOOK_URL is set; otherwise the bot long-polls.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub public_url: String,
    pub listen_addr: String,
    pub secret_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN").context("BOT_TOKEN must be set in the environment or .env file")?;

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a positive integer, got '{}'", raw))?,
            None => 5,
        };

        let poll_timeout_secs = match get("POLL_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("POLL_TIMEOUT_SECS must be a number of seconds, got '{}'", raw))?,
            None => 30,
        };

        let webhook = get("WEBHOOK_URL").map(|public_url| WebhookConfig {
            public_url,
            listen_addr: get("WEBHOOK_ADDR").unwrap_or_else(|| DEFAULT_WEBHOOK_ADDR.to_string()),
            secret_token: get("WEBHOOK_SECRET"),
        });

        Ok(Self {
            bot_token,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections,
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            poll_timeout_secs,
            webhook,
        })
    }
}
