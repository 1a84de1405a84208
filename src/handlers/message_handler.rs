use anyhow::Result;
use std::sync::Arc;

use crate::errors::BotError;
use crate::handlers::{banter, RegistrationFlow};
use crate::services::intake::parse_intake;
use crate::services::{Catalog, ChatService, IntakeResolver, Ledger};

pub const STATS_BUTTON: &str = "📊 Статистика";
pub const SNACK_BUTTON: &str = "🍎 Быстрый перекус";
pub const RESET_BUTTON: &str = "♻️ Сброс дня";

pub const MAIN_KEYBOARD: &[&[&str]] = &[&[STATS_BUTTON, SNACK_BUTTON], &[RESET_BUTTON]];

const GENERIC_ERROR: &str = "Произошла ошибка. Попробуй позже.";
const NOT_REGISTERED: &str = "Сначала зарегистрируйся через /start";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Start,
    AddProduct,
    ShowStats,
    ResetDay,
    QuickSnack,
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    /// `/name`, optionally addressed as `/name@BotName`, with any arguments
    Command(&'static str),
    /// exact text, as sent by a keyboard button
    Text(&'static str),
}

impl Trigger {
    fn matches(&self, text: &str) -> bool {
        match self {
            Trigger::Command(name) => command_name(text) == Some(*name),
            Trigger::Text(label) => text.trim() == *label,
        }
    }
}

/// Evaluated top to bottom after the registration check; free text that
/// matches nothing goes to the intake pipeline.
const ROUTES: &[(Trigger, Route)] = &[
    (Trigger::Command("start"), Route::Start),
    (Trigger::Command("addproduct"), Route::AddProduct),
    (Trigger::Text(STATS_BUTTON), Route::ShowStats),
    (Trigger::Text(RESET_BUTTON), Route::ResetDay),
    (Trigger::Text(SNACK_BUTTON), Route::QuickSnack),
];

fn route_for(text: &str) -> Option<Route> {
    ROUTES
        .iter()
        .find(|(trigger, _)| trigger.matches(text))
        .map(|(_, route)| *route)
}

/// Command word without the leading slash and `@BotName` suffix.
fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    command.split('@').next().filter(|name| !name.is_empty())
}

/// Maps a failed operation to the user-facing reply. Storage detail only
/// goes to the log.
pub async fn report_failure(
    chat: &dyn ChatService,
    chat_id: i64,
    context: &str,
    err: BotError,
) -> Result<()> {
    match err {
        BotError::NotRegistered(user_id) => {
            log::info!("User {} is not registered ({})", user_id, context);
            chat.send_message(chat_id, NOT_REGISTERED).await
        }
        BotError::Validation(message) => chat.send_message(chat_id, &message).await,
        BotError::Storage(e) => {
            log::error!("❌ Storage error in {}: {:?}", context, e);
            chat.send_message(chat_id, GENERIC_ERROR).await
        }
    }
}

pub struct MessageHandler {
    ledger: Arc<Ledger>,
    catalog: Arc<Catalog>,
    resolver: IntakeResolver,
    registration: RegistrationFlow,
    chat: Arc<dyn ChatService>,
}

impl MessageHandler {
    pub fn new(ledger: Arc<Ledger>, catalog: Arc<Catalog>, chat: Arc<dyn ChatService>) -> Self {
        Self {
            resolver: IntakeResolver::new(catalog.clone(), ledger.clone()),
            registration: RegistrationFlow::new(ledger.clone(), chat.clone()),
            ledger,
            catalog,
            chat,
        }
    }

    pub async fn handle_message(&self, user_id: i64, chat_id: i64, text: &str) -> Result<()> {
        log::info!("📨 INCOMING MESSAGE - From: {} | Chat: {} | Content: '{}'", user_id, chat_id, text);

        // An open registration swallows everything; /start restarts it
        if self.registration.is_active(user_id).await {
            if command_name(text) == Some("start") {
                return self.registration.begin(user_id, chat_id).await;
            }
            return self.registration.handle_step(user_id, chat_id, text).await;
        }

        let route = route_for(text);

        if route.is_none() && command_name(text).is_none() {
            if let Some(joke) = banter::joke_for(text) {
                // Intake below must still run if the joke is not delivered
                if let Err(e) = self.chat.send_message(chat_id, joke).await {
                    log::warn!("⚠️ Failed to send joke to chat {}: {}", chat_id, e);
                }
            }
        }

        match route {
            Some(Route::Start) => self.handle_start(user_id, chat_id).await,
            Some(Route::AddProduct) => self.handle_add_product(chat_id, text).await,
            Some(Route::ShowStats) => self.handle_stats(user_id, chat_id).await,
            Some(Route::ResetDay) => self.handle_reset(user_id, chat_id).await,
            Some(Route::QuickSnack) => self.handle_quick_snack(chat_id).await,
            None if command_name(text).is_some() => {
                log::debug!("Ignoring unknown command from {}: {}", user_id, text);
                Ok(())
            }
            None => self.handle_food_input(user_id, chat_id, text).await,
        }
    }

    async fn handle_start(&self, user_id: i64, chat_id: i64) -> Result<()> {
        match self.ledger.user(user_id).await {
            Ok(Some(user)) => {
                log::debug!("Returning user {}", user.id);
                let msg = format!("С возвращением, {}!", user.name);
                self.chat
                    .send_message_with_keyboard(chat_id, &msg, MAIN_KEYBOARD)
                    .await
            }
            Ok(None) => self.registration.begin(user_id, chat_id).await,
            Err(e) => report_failure(self.chat.as_ref(), chat_id, "/start", e).await,
        }
    }

    async fn handle_add_product(&self, chat_id: i64, text: &str) -> Result<()> {
        let args: Vec<&str> = text.split_whitespace().skip(1).collect();
        let (name, kcal) = match args.as_slice() {
            [name, kcal] => (*name, *kcal),
            _ => {
                return self
                    .chat
                    .send_message(
                        chat_id,
                        "Формат: /addproduct продукт ккал\nПример: /addproduct яблоко 52",
                    )
                    .await;
            }
        };

        match self.catalog.add_product(name, kcal).await {
            Ok(product) => {
                let msg = format!(
                    "Продукт '{}' добавлен с {} ккал/100 г",
                    product.name, product.kcal_per_100g
                );
                self.chat.send_message(chat_id, &msg).await
            }
            Err(e) => report_failure(self.chat.as_ref(), chat_id, "/addproduct", e).await,
        }
    }

    async fn handle_stats(&self, user_id: i64, chat_id: i64) -> Result<()> {
        match self.ledger.stats(user_id).await {
            Ok(stats) => {
                let msg = format!(
                    "Цель: {} ккал\nСъедено: {:.1} ккал\nОсталось: {:.1} ккал",
                    stats.goal, stats.eaten, stats.remaining
                );
                self.chat.send_message(chat_id, &msg).await
            }
            Err(e) => report_failure(self.chat.as_ref(), chat_id, "stats", e).await,
        }
    }

    async fn handle_reset(&self, user_id: i64, chat_id: i64) -> Result<()> {
        match self.ledger.reset_day(user_id).await {
            Ok(()) => {
                self.chat
                    .send_message(chat_id, "День сброшен! Счётчик калорий обнулён")
                    .await
            }
            Err(e) => report_failure(self.chat.as_ref(), chat_id, "reset_day", e).await,
        }
    }

    async fn handle_quick_snack(&self, chat_id: i64) -> Result<()> {
        self.chat
            .send_message(
                chat_id,
                "Напиши что съел в формате: продукт количество [продукт количество ...]\n\
                 Пример: гречка 100 курица 200",
            )
            .await
    }

    /// Silent unless at least one product was recognised.
    async fn handle_food_input(&self, user_id: i64, chat_id: i64, text: &str) -> Result<()> {
        let pairs = parse_intake(text);
        if pairs.is_empty() {
            return Ok(());
        }

        match self.resolver.resolve(user_id, &pairs).await {
            Ok(Some(report)) => self.chat.send_message(chat_id, &report.to_message()).await,
            Ok(None) => Ok(()),
            Err(e) => report_failure(self.chat.as_ref(), chat_id, "food input", e).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chat::MockChatClient;
    use crate::services::Database;

    const USER: i64 = 100;
    const CHAT: i64 = 500;

    async fn setup() -> (MessageHandler, Arc<Ledger>, Arc<MockChatClient>) {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let ledger = Arc::new(Ledger::new(db.clone()));
        let catalog = Arc::new(Catalog::new(db));
        catalog.seed_defaults().await.unwrap();
        let chat = Arc::new(MockChatClient::new());
        let handler = MessageHandler::new(ledger.clone(), catalog, chat.clone());
        (handler, ledger, chat)
    }

    async fn register(handler: &MessageHandler, chat: &MockChatClient) {
        handler.handle_message(USER, CHAT, "/start").await.unwrap();
        handler.handle_message(USER, CHAT, "Дима").await.unwrap();
        handler.handle_message(USER, CHAT, "2000").await.unwrap();
        chat.take();
    }

    #[test]
    fn test_command_name() {
        assert_eq!(command_name("/start"), Some("start"));
        assert_eq!(command_name("/addproduct@CalorieBot яблоко 52"), Some("addproduct"));
        assert_eq!(command_name("start"), None);
        assert_eq!(command_name("/"), None);
        assert_eq!(command_name(""), None);
    }

    #[test]
    fn test_route_priority() {
        assert_eq!(route_for("/start"), Some(Route::Start));
        assert_eq!(route_for("/addproduct a 1"), Some(Route::AddProduct));
        assert_eq!(route_for(STATS_BUTTON), Some(Route::ShowStats));
        assert_eq!(route_for(RESET_BUTTON), Some(Route::ResetDay));
        assert_eq!(route_for(SNACK_BUTTON), Some(Route::QuickSnack));
        assert_eq!(route_for("Статистика"), None);
        assert_eq!(route_for("гречка 100"), None);
    }

    #[tokio::test]
    async fn test_full_registration_and_food_flow() {
        let (handler, ledger, chat) = setup().await;
        register(&handler, &chat).await;

        handler.handle_message(USER, CHAT, "гречка 100 курица 200").await.unwrap();

        let sent = chat.take();
        let reply = &sent.last().unwrap().text;
        assert!(reply.starts_with("Добавлено:\nГречка 100 г → 313.0 ккал\nКурица 200 г → 330.0 ккал"));
        assert!(reply.ends_with("Итого: +643.0 ккал"));
        assert_eq!(ledger.stats(USER).await.unwrap().eaten, 643.0);

        handler.handle_message(USER, CHAT, STATS_BUTTON).await.unwrap();
        assert_eq!(
            chat.take()[0].text,
            "Цель: 2000 ккал\nСъедено: 643.0 ккал\nОсталось: 1357.0 ккал"
        );
    }

    #[tokio::test]
    async fn test_registration_suppresses_other_handlers() {
        let (handler, ledger, chat) = setup().await;

        handler.handle_message(USER, CHAT, "/start").await.unwrap();
        handler.handle_message(USER, CHAT, STATS_BUTTON).await.unwrap();

        // the button label was taken as the name
        let sent = chat.take();
        assert!(sent.last().unwrap().text.starts_with(&format!("Отлично, {}!", STATS_BUTTON)));
        assert!(ledger.user(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_start_for_registered_user_welcomes_back() {
        let (handler, _, chat) = setup().await;
        register(&handler, &chat).await;

        handler.handle_message(USER, CHAT, "/start").await.unwrap();

        let sent = chat.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "С возвращением, Дима!");
        assert!(sent[0].with_keyboard);

        // no session was opened
        handler.handle_message(USER, CHAT, "рис 100").await.unwrap();
        assert!(chat.take()[0].text.starts_with("Добавлено:"));
    }

    #[tokio::test]
    async fn test_odd_and_unknown_input_is_silent() {
        let (handler, ledger, chat) = setup().await;
        register(&handler, &chat).await;

        handler.handle_message(USER, CHAT, "рис 100 курица").await.unwrap();
        handler.handle_message(USER, CHAT, "пицца 300").await.unwrap();
        handler.handle_message(USER, CHAT, "привет").await.unwrap();

        assert!(chat.sent().is_empty());
        assert_eq!(ledger.stats(USER).await.unwrap().eaten, 0.0);
    }

    #[tokio::test]
    async fn test_unregistered_user_is_prompted() {
        let (handler, _, chat) = setup().await;

        handler.handle_message(USER, CHAT, "рис 100").await.unwrap();
        handler.handle_message(USER, CHAT, STATS_BUTTON).await.unwrap();

        let sent = chat.take();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.text == NOT_REGISTERED));
    }

    #[tokio::test]
    async fn test_reset_day_for_unregistered_user_is_lenient() {
        let (handler, _, chat) = setup().await;

        handler.handle_message(USER, CHAT, RESET_BUTTON).await.unwrap();

        assert_eq!(chat.take()[0].text, "День сброшен! Счётчик калорий обнулён");
    }

    #[tokio::test]
    async fn test_reset_day_zeroes_eaten() {
        let (handler, ledger, chat) = setup().await;
        register(&handler, &chat).await;

        handler.handle_message(USER, CHAT, "овсянка 50").await.unwrap();
        handler.handle_message(USER, CHAT, RESET_BUTTON).await.unwrap();

        assert_eq!(ledger.stats(USER).await.unwrap().eaten, 0.0);
    }

    #[tokio::test]
    async fn test_add_product_command() {
        let (handler, ledger, chat) = setup().await;
        register(&handler, &chat).await;

        handler.handle_message(USER, CHAT, "/addproduct Яблоко 52").await.unwrap();
        handler.handle_message(USER, CHAT, "/addproduct яблоко").await.unwrap();
        handler.handle_message(USER, CHAT, "/addproduct яблоко много").await.unwrap();
        handler.handle_message(USER, CHAT, "/addproduct red apple 52").await.unwrap();

        let sent: Vec<String> = chat.take().into_iter().map(|m| m.text).collect();
        assert_eq!(sent[0], "Продукт 'яблоко' добавлен с 52 ккал/100 г");
        assert!(sent[1].starts_with("Формат: /addproduct"));
        assert_eq!(sent[2], "Калории должны быть числом");
        assert!(sent[3].starts_with("Формат: /addproduct"));

        handler.handle_message(USER, CHAT, "яблоко 200").await.unwrap();
        assert_eq!(ledger.stats(USER).await.unwrap().eaten, 104.0);
    }

    #[tokio::test]
    async fn test_buckwheat_joke_is_a_side_effect() {
        let (handler, ledger, chat) = setup().await;
        register(&handler, &chat).await;

        handler.handle_message(USER, CHAT, "гречка 200").await.unwrap();

        let sent = chat.take();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].text.starts_with("Гречка level 100"));
        assert!(sent[1].text.starts_with("Добавлено:"));
        assert_eq!(ledger.stats(USER).await.unwrap().eaten, 626.0);
    }

    #[tokio::test]
    async fn test_start_during_registration_restarts() {
        let (handler, _, chat) = setup().await;

        handler.handle_message(USER, CHAT, "/start").await.unwrap();
        handler.handle_message(USER, CHAT, "Дима").await.unwrap();
        handler.handle_message(USER, CHAT, "/start").await.unwrap();
        handler.handle_message(USER, CHAT, "Дмитрий").await.unwrap();

        assert!(chat.take().last().unwrap().text.starts_with("Отлично, Дмитрий!"));
    }

    /// Delivers everything except the buckwheat joke.
    struct JokeRejectingChat {
        inner: MockChatClient,
    }

    #[async_trait::async_trait]
    impl ChatService for JokeRejectingChat {
        async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
            if text.starts_with("Гречка level") {
                anyhow::bail!("chat unavailable");
            }
            self.inner.send_message(chat_id, text).await
        }

        async fn send_message_with_keyboard(
            &self,
            chat_id: i64,
            text: &str,
            keyboard: &[&[&str]],
        ) -> Result<()> {
            self.inner.send_message_with_keyboard(chat_id, text, keyboard).await
        }
    }

    #[tokio::test]
    async fn test_undelivered_joke_still_records_intake() {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let ledger = Arc::new(Ledger::new(db.clone()));
        let catalog = Arc::new(Catalog::new(db));
        catalog.seed_defaults().await.unwrap();
        let chat = Arc::new(JokeRejectingChat { inner: MockChatClient::new() });
        let handler = MessageHandler::new(ledger.clone(), catalog, chat.clone());

        handler.handle_message(USER, CHAT, "/start").await.unwrap();
        handler.handle_message(USER, CHAT, "Дима").await.unwrap();
        handler.handle_message(USER, CHAT, "2000").await.unwrap();
        chat.inner.take();

        handler.handle_message(USER, CHAT, "гречка 100").await.unwrap();

        assert_eq!(ledger.stats(USER).await.unwrap().eaten, 313.0);
        let sent = chat.inner.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Добавлено:\nГречка 100 г → 313.0 ккал");
    }

    #[tokio::test]
    async fn test_no_joke_for_commands_or_open_registration() {
        let (handler, ledger, chat) = setup().await;

        // mid-registration: taken as the name, no joke
        handler.handle_message(USER, CHAT, "/start").await.unwrap();
        handler.handle_message(USER, CHAT, "гречка 100").await.unwrap();
        let sent = chat.take();
        assert!(sent.iter().all(|m| !m.text.starts_with("Гречка level")));
        assert!(sent.last().unwrap().text.starts_with("Отлично, гречка 100!"));

        handler.handle_message(USER, CHAT, "2000").await.unwrap();
        chat.take();

        handler.handle_message(USER, CHAT, "/addproduct гречка 300").await.unwrap();
        let sent = chat.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Продукт 'гречка' добавлен с 300 ккал/100 г");

        // unknown commands get neither a joke nor intake
        handler.handle_message(USER, CHAT, "/гречка 100").await.unwrap();
        assert!(chat.take().is_empty());
        assert_eq!(ledger.stats(USER).await.unwrap().eaten, 0.0);
    }
}
