use thiserror::Error;

/// Failures the ledger, catalog and registration code can produce.
///
/// Only `Storage` carries internal detail; it is logged and never shown
/// to the user.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("user {0} is not registered")]
    NotRegistered(i64),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type BotResult<T> = Result<T, BotError>;

impl BotError {
    pub fn validation(message: impl Into<String>) -> Self {
        BotError::Validation(message.into())
    }
}
