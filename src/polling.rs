use std::sync::Arc;
use std::time::Duration;

use crate::handlers::MessageHandler;
use crate::services::TelegramClient;
use crate::webhook::handle_update;

const RETRY_PAUSE: Duration = Duration::from_secs(3);

/// Long-poll Telegram forever. Updates are handled one at a time so a
/// user's messages are always processed in the order they were sent.
pub async fn run_polling(
    client: Arc<TelegramClient>,
    handler: Arc<MessageHandler>,
    timeout_secs: u64,
) {
    let mut offset = 0;

    loop {
        let updates = match client.get_updates(offset, timeout_secs).await {
            Ok(updates) => updates,
            Err(e) => {
                log::error!("❌ getUpdates failed: {:#}", e);
                tokio::time::sleep(RETRY_PAUSE).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let update_id = update.update_id;
            if let Err(e) = handle_update(&handler, update).await {
                log::error!("❌ Failed to process update {}: {:#}", update_id, e);
            }
        }
    }
}
