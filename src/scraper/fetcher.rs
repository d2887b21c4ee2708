use crate::model::{FetchError, SelectorKind};
use crate::normalizer::normalize_elements;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{error, info, warn};

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_12_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/61.0.3163.100 Safari/537.36";
pub const STATIC_TIMEOUT: Duration = Duration::from_secs(10);

/// Plain HTTP fetch, no script execution.
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(STATIC_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    pub async fn fetch(
        &self,
        url: &str,
        selector: &str,
        kind: SelectorKind,
    ) -> Result<Vec<String>, FetchError> {
        let tag = match kind {
            SelectorKind::Css => "STATIC_CSS",
            SelectorKind::Class => "STATIC_CLASS",
        };

        let html = match self.fetch_html(url).await {
            Ok(html) => {
                info!("[{}] request succeeded", tag);
                html
            }
            Err(e) => {
                error!("[{}] request failed: {}", tag, e);
                return Err(e);
            }
        };

        match select_texts(&html, selector, kind) {
            Ok(texts) => {
                info!("[{}] selected {} elements", tag, texts.len());
                Ok(texts)
            }
            Err(FetchError::NoMatch(sel)) => {
                warn!("[{}] no elements matched '{}'", tag, sel);
                Err(FetchError::NoMatch(sel))
            }
            Err(e) => {
                error!("[{}] element selection failed: {}", tag, e);
                Err(e)
            }
        }
    }
}

/// Parses `html` and returns the normalized text of every matching element.
///
/// In class mode a single token matches any element carrying that class; a
/// value with spaces must equal the whole `class` attribute.
pub fn select_texts(html: &str, selector: &str, kind: SelectorKind) -> Result<Vec<String>, FetchError> {
    let document = Html::parse_document(html);

    let elements: Vec<ElementRef> = match kind {
        SelectorKind::Css => {
            let css = Selector::parse(selector)
                .map_err(|_| FetchError::Selector(selector.to_string()))?;
            document.select(&css).collect()
        }
        SelectorKind::Class => {
            let any = Selector::parse("[class]")
                .map_err(|_| FetchError::Selector(selector.to_string()))?;
            let wanted = selector.trim();
            document
                .select(&any)
                .filter(|el| {
                    if wanted.contains(char::is_whitespace) {
                        el.value().attr("class").map(str::trim) == Some(wanted)
                    } else {
                        el.value().classes().any(|class| class == wanted)
                    }
                })
                .collect()
        }
    };

    if elements.is_empty() {
        return Err(FetchError::NoMatch(selector.to_string()));
    }

    Ok(normalize_elements(&elements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOARD: &str = r#"
        <html><body>
          <table class="board">
            <tr><td class="subject title">2025 장학생
                 선발 공고</td></tr>
            <tr><td class="subject">행사 안내</td></tr>
          </table>
          <p class="title">기타</p>
        </body></html>"#;

    #[test]
    fn selects_by_css_expression() {
        let texts = select_texts(BOARD, "table.board td", SelectorKind::Css).unwrap();
        assert_eq!(texts, vec!["2025 장학생 선발 공고", "행사 안내"]);
    }

    #[test]
    fn selects_by_class_token() {
        let texts = select_texts(BOARD, "title", SelectorKind::Class).unwrap();
        assert_eq!(texts, vec!["2025 장학생 선발 공고", "기타"]);
    }

    #[test]
    fn class_value_with_spaces_matches_whole_attribute() {
        let texts = select_texts(BOARD, "subject title", SelectorKind::Class).unwrap();
        assert_eq!(texts, vec!["2025 장학생 선발 공고"]);
    }

    #[test]
    fn zero_matches_is_no_match() {
        let err = select_texts(BOARD, "div.notice", SelectorKind::Css).unwrap_err();
        assert!(matches!(err, FetchError::NoMatch(ref s) if s == "div.notice"));
    }

    #[test]
    fn invalid_css_is_selector_error() {
        let err = select_texts(BOARD, "td[", SelectorKind::Css).unwrap_err();
        assert!(matches!(err, FetchError::Selector(_)));
    }

    #[tokio::test]
    async fn fetches_and_selects_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notice"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BOARD))
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new().unwrap();
        let texts = fetcher
            .fetch(&format!("{}/notice", server.uri()), "td", SelectorKind::Css)
            .await
            .unwrap();
        assert_eq!(texts.len(), 2);
    }

    #[tokio::test]
    async fn error_status_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new().unwrap();
        let err = fetcher
            .fetch(&server.uri(), "td", SelectorKind::Css)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let fetcher = StaticFetcher::new().unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:9/notice", "td", SelectorKind::Css)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout(_)));
    }
}
