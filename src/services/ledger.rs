use std::sync::Arc;

use crate::errors::{BotError, BotResult};
use crate::models::{DailyStats, User};
use crate::services::Database;

/// Per-user daily calorie record: goal and what has been eaten so far.
pub struct Ledger {
    db: Arc<Database>,
}

impl Ledger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Creates or fully overwrites the user's record with eaten = 0.
    pub async fn register(&self, user_id: i64, name: &str, goal: f64) -> BotResult<()> {
        if name.trim().is_empty() {
            return Err(BotError::validation("Имя не может быть пустым. Попробуй ещё раз."));
        }
        if !(goal.is_finite() && goal > 0.0) {
            return Err(BotError::validation("Норма должна быть больше 0"));
        }

        self.db.upsert_user(user_id, name, goal).await?;
        log::info!("✅ User {} registered as '{}' with goal {} kcal", user_id, name, goal);
        Ok(())
    }

    pub async fn user(&self, user_id: i64) -> BotResult<Option<User>> {
        self.db.get_user(user_id).await
    }

    pub async fn is_registered(&self, user_id: i64) -> BotResult<bool> {
        self.db.user_exists(user_id).await
    }

    pub async fn stats(&self, user_id: i64) -> BotResult<DailyStats> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or(BotError::NotRegistered(user_id))?;

        Ok(DailyStats::new(user.goal, user.eaten))
    }

    /// Zeroes the running total. Unknown ids are a silent no-op.
    pub async fn reset_day(&self, user_id: i64) -> BotResult<()> {
        let touched = self.db.reset_eaten(user_id).await?;
        if touched == 0 {
            log::debug!("Reset requested for unregistered user {}", user_id);
        } else {
            log::info!("♻️ Day reset for user {}", user_id);
        }
        Ok(())
    }

    pub async fn add_eaten(&self, user_id: i64, kcal: f64) -> BotResult<()> {
        match self.db.add_eaten(user_id, kcal).await? {
            0 => Err(BotError::NotRegistered(user_id)),
            _ => Ok(()),
        }
    }
}
