use anyhow::Result;

/// Outbound side of the chat transport.
#[async_trait::async_trait]
pub trait ChatService: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Send a message together with a persistent reply keyboard.
    /// keyboard: rows of button labels; pressing one sends its label as text.
    /// Default implementation sends plain text (for clients without keyboards)
    async fn send_message_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        _keyboard: &[&[&str]],
    ) -> Result<()> {
        self.send_message(chat_id, text).await
    }
}

#[cfg(test)]
pub use mock::MockChatClient;
