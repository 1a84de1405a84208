pub mod banter;
pub mod message_handler;
pub mod registration;

pub use message_handler::MessageHandler;
pub use registration::RegistrationFlow;
