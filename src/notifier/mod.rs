pub mod messages;
pub mod slack;

pub use slack::SlackNotifier;

use crate::model::NotifyError;

/// Outbound text channel. Failures come back as values; callers log them.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError>;
}
