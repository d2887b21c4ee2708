pub mod chain;
pub mod chromium;
pub mod fetcher;
pub mod rendered;
pub mod traits;

pub use chain::{ChainOutcome, plan, run_chain};
pub use chromium::ChromiumSession;
pub use fetcher::StaticFetcher;
pub use rendered::{BrowserSession, WaitPolicy};
pub use traits::Extractor;

use crate::model::{FetchError, StrategyKind};
use crate::normalizer::normalize_elements;
use rendered::fetch_rendered;
use tracing::{error, info};

/// Routes static strategies to the HTTP fetcher and rendered ones to the
/// shared browser session.
pub struct ExtractorImpl<S> {
    fetcher: StaticFetcher,
    session: Option<S>,
    policy: WaitPolicy,
}

impl<S: BrowserSession> ExtractorImpl<S> {
    pub fn new(fetcher: StaticFetcher, session: Option<S>) -> Self {
        Self {
            fetcher,
            session,
            policy: WaitPolicy::default(),
        }
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Closes the browser session, if any. Errors are logged only.
    pub async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close().await {
                Ok(()) => info!("[DRIVER] browser closed"),
                Err(e) => error!("[DRIVER] error while closing browser: {}", e),
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: BrowserSession> Extractor for ExtractorImpl<S> {
    async fn extract(
        &mut self,
        kind: StrategyKind,
        url: &str,
        selector: &str,
    ) -> Result<Vec<String>, FetchError> {
        if !kind.is_rendered() {
            return self.fetcher.fetch(url, selector, kind.selector_kind()).await;
        }

        let session = self.session.as_mut().ok_or(FetchError::Unavailable)?;
        let nodes = fetch_rendered(session, url, selector, kind.selector_kind(), self.policy).await?;
        Ok(normalize_elements(&nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::rendered::tests::{FakeSession, instant};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn rendered_strategy_uses_browser_session() {
        let session = FakeSession::default().frame(&[], &["  렌더링된\n공지 "], 0);
        let mut extractor =
            ExtractorImpl::new(StaticFetcher::new().unwrap(), Some(session)).with_policy(instant());

        let data = extractor
            .extract(StrategyKind::RenderedClass, "https://a.kr", "notice")
            .await
            .unwrap();
        assert_eq!(data, vec!["렌더링된 공지"]);
    }

    #[tokio::test]
    async fn rendered_strategy_without_browser_is_unavailable() {
        let mut extractor: ExtractorImpl<FakeSession> =
            ExtractorImpl::new(StaticFetcher::new().unwrap(), None);

        let err = extractor
            .extract(StrategyKind::RenderedCss, "https://a.kr", "li")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unavailable));
    }

    #[tokio::test]
    async fn static_strategy_goes_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ul><li>장학</li></ul>"))
            .mount(&server)
            .await;
        let mut extractor = ExtractorImpl::new(StaticFetcher::new().unwrap(), Some(FakeSession::default()));

        let data = extractor
            .extract(StrategyKind::StaticCss, &server.uri(), "li")
            .await
            .unwrap();
        assert_eq!(data, vec!["장학"]);
    }
}
