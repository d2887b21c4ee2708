pub mod sender;

use super::Notifier;
use crate::model::NotifyError;
use reqwest::Client;
use std::time::Duration;

pub const SLACK_API: &str = "https://slack.com/api";

pub struct SlackNotifier {
    pub token: Option<String>,
    pub client: Client,
    pub base_url: String,
}

impl SlackNotifier {
    pub fn new(token: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            token,
            client,
            base_url: SLACK_API.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError> {
        sender::post_message(self, channel, text).await
    }
}
