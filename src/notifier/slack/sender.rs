// notifier/slack/sender.rs

use crate::model::NotifyError;
use crate::notifier::slack::SlackNotifier;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts `text` to `channel` through `chat.postMessage`.
pub async fn post_message(notifier: &SlackNotifier, channel: &str, text: &str) -> Result<(), NotifyError> {
    let token = notifier.token.as_deref().ok_or(NotifyError::MissingToken)?;
    let url = format!("{}/chat.postMessage", notifier.base_url);

    let response = notifier
        .client
        .post(&url)
        .bearer_auth(token)
        .json(&json!({ "channel": channel, "text": text }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        warn!("[SLACK] API responded [{}]", status);
        return Err(NotifyError::Api(format!("HTTP {}", status)));
    }

    let body: SlackResponse = response.json().await?;
    if !body.ok {
        let error = body.error.unwrap_or_else(|| "unknown".into());
        warn!("[SLACK] message rejected: {}", error);
        return Err(NotifyError::Api(error));
    }

    info!("[SLACK] message sent to {}", channel);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::Notifier;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn notifier(server: &MockServer) -> SlackNotifier {
        SlackNotifier::new(Some("xoxb-test".into()))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn posts_message_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_partial_json(json!({ "channel": "#janghak", "text": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "ts": "1.2" })))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server).await.send("#janghak", "hello").await.unwrap();
    }

    #[tokio::test]
    async fn api_error_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
            )
            .mount(&server)
            .await;

        let err = notifier(&server).await.send("#nope", "hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::Api(ref e) if e == "channel_not_found"));
    }

    #[tokio::test]
    async fn missing_token_fails_without_request() {
        let notifier = SlackNotifier::new(None).unwrap();
        let err = notifier.send("#janghak", "hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::MissingToken));
    }
}
