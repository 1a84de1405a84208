pub mod database;
pub mod catalog; // Product name -> kcal/100g table
pub mod ledger; // Per-user goal and eaten-today record
pub mod intake; // Food message parsing and resolution
pub mod chat;
pub mod telegram; // Telegram Bot API

pub use database::Database;
pub use catalog::Catalog;
pub use ledger::Ledger;
pub use intake::IntakeResolver;
pub use chat::ChatService;
pub use telegram::TelegramClient;
