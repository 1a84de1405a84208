use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::handlers::message_handler::{report_failure, MAIN_KEYBOARD};
use crate::models::RegistrationStep;
use crate::services::intake::parse_decimal;
use crate::services::{ChatService, Ledger};

/// Two-step sign-up conversation: name first, then the daily goal.
///
/// Sessions live only in memory; a restart drops half-finished sign-ups.
/// Abandoned sign-ups are never evicted and stay until the process exits.
pub struct RegistrationFlow {
    ledger: Arc<Ledger>,
    chat: Arc<dyn ChatService>,
    sessions: Mutex<HashMap<i64, RegistrationStep>>,
}

impl RegistrationFlow {
    pub fn new(ledger: Arc<Ledger>, chat: Arc<dyn ChatService>) -> Self {
        Self {
            ledger,
            chat,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn is_active(&self, user_id: i64) -> bool {
        self.sessions.lock().await.contains_key(&user_id)
    }

    #[cfg(test)]
    pub async fn step(&self, user_id: i64) -> Option<RegistrationStep> {
        self.sessions.lock().await.get(&user_id).cloned()
    }

    /// Opens (or restarts) a session at the name prompt.
    pub async fn begin(&self, user_id: i64, chat_id: i64) -> Result<()> {
        self.sessions
            .lock()
            .await
            .insert(user_id, RegistrationStep::AwaitingName);

        self.chat
            .send_message(chat_id, "Привет! Давай зарегистрируемся. Как тебя зовут?")
            .await?;

        log::info!("🆕 Registration started for user: {}", user_id);
        Ok(())
    }

    pub async fn handle_step(&self, user_id: i64, chat_id: i64, text: &str) -> Result<()> {
        let step = self.sessions.lock().await.get(&user_id).cloned();

        match step {
            Some(RegistrationStep::AwaitingName) => self.save_name(user_id, chat_id, text).await,
            Some(RegistrationStep::AwaitingGoal { name }) => {
                self.save_goal(user_id, chat_id, &name, text).await
            }
            None => {
                log::warn!("No registration session for user {}", user_id);
                Ok(())
            }
        }
    }

    async fn save_name(&self, user_id: i64, chat_id: i64, text: &str) -> Result<()> {
        let name = text.trim();
        if name.is_empty() {
            self.chat
                .send_message(chat_id, "Имя не может быть пустым. Попробуй ещё раз.")
                .await?;
            return Ok(());
        }

        self.sessions.lock().await.insert(
            user_id,
            RegistrationStep::AwaitingGoal {
                name: name.to_string(),
            },
        );

        let msg = format!(
            "Отлично, {}! Теперь укажи свою дневную норму калорий.\n\
             Пример: 2200 или 1850.5",
            name
        );
        self.chat.send_message(chat_id, &msg).await?;
        Ok(())
    }

    async fn save_goal(&self, user_id: i64, chat_id: i64, name: &str, text: &str) -> Result<()> {
        let goal = match parse_decimal(text) {
            Some(goal) if goal > 0.0 => goal,
            _ => {
                self.chat
                    .send_message(
                        chat_id,
                        "Пожалуйста, введи нормальное число (можно с точкой).\nПример: 2100",
                    )
                    .await?;
                return Ok(());
            }
        };

        if let Err(e) = self.ledger.register(user_id, name, goal).await {
            // Session is kept so the user can simply send the goal again
            return report_failure(self.chat.as_ref(), chat_id, "registration", e).await;
        }

        self.sessions.lock().await.remove(&user_id);

        let msg = format!(
            "Готово, {}! Твоя цель — {} ккал в день.\n\
             Теперь можешь добавлять еду в формате: продукт количество [продукт количество ...]\n\
             Пример: гречка 100 курица 200 рис 150",
            name, goal
        );
        self.chat
            .send_message_with_keyboard(chat_id, &msg, MAIN_KEYBOARD)
            .await?;
        Ok(())
    }
}
