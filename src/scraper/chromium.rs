//! Chromium-backed browser session using chromiumoxide.

use super::fetcher::USER_AGENT;
use super::rendered::{BrowserSession, FramePath};
use crate::config::BrowserSettings;
use crate::model::{FetchError, SelectorKind};
use crate::normalizer::RenderedNode;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// One headless Chromium instance with a single page.
///
/// Frame switching is emulated: queries run in the top page and descend
/// through `iframe.contentDocument`, so only same-origin frames are reachable.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    frame: FramePath,
}

impl ChromiumSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--lang=ko_KR")
            .arg(format!("--user-agent={}", USER_AGENT));
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(FetchError::Session)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Session(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Session(format!("failed to create page: {e}")))?;

        info!("[DRIVER] Chromium started");
        Ok(Self {
            browser,
            page,
            handler,
            frame: FramePath::top(),
        })
    }

    /// Runs `body` with `doc` bound to the document of `path`. The script
    /// evaluates to `null` when the frame cannot be reached.
    fn frame_script(path: &FramePath, body: &str) -> String {
        let indices = serde_json::to_string(path.indices()).unwrap_or_else(|_| "[]".into());
        format!(
            r#"(() => {{
                let doc = document;
                for (const index of {indices}) {{
                    const frame = doc.querySelectorAll('iframe')[index];
                    if (!frame) return null;
                    try {{ doc = frame.contentDocument; }} catch (e) {{ return null; }}
                    if (!doc) return null;
                }}
                {body}
            }})()"#
        )
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: String) -> Result<T, FetchError> {
        let result = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| FetchError::Session(format!("script failed: {e}")))?;

        result
            .into_value()
            .map_err(|e| FetchError::Session(format!("unexpected script result: {e:?}")))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.frame = FramePath::top();
        match tokio::time::timeout(NAVIGATION_TIMEOUT, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(FetchError::Session(format!("navigation failed: {e}"))),
            Err(_) => Err(FetchError::Timeout(format!(
                "navigation timed out after {}s",
                NAVIGATION_TIMEOUT.as_secs()
            ))),
        }
    }

    async fn find_nodes(
        &mut self,
        selector: &str,
        kind: SelectorKind,
    ) -> Result<Vec<RenderedNode>, FetchError> {
        let quoted = serde_json::to_string(selector)
            .map_err(|e| FetchError::Selector(format!("{selector}: {e}")))?;
        let query = match kind {
            SelectorKind::Css => format!("doc.querySelectorAll({quoted})"),
            SelectorKind::Class => format!("doc.getElementsByClassName({quoted})"),
        };
        let body = format!(
            "return Array.from({query}).map(el => typeof el.innerText === 'string' ? el.innerText : null);"
        );

        let texts: Option<Vec<Option<String>>> =
            self.evaluate(Self::frame_script(&self.frame, &body)).await?;
        let texts = texts.ok_or_else(|| FetchError::Frame(self.frame.to_string()))?;
        debug!("[RENDERED] {} candidates in frame {}", texts.len(), self.frame);

        Ok(texts.into_iter().map(|text| RenderedNode { text }).collect())
    }

    async fn frame_count(&mut self) -> Result<usize, FetchError> {
        let count: Option<usize> = self
            .evaluate(Self::frame_script(
                &self.frame,
                "return doc.querySelectorAll('iframe').length;",
            ))
            .await?;
        count.ok_or_else(|| FetchError::Frame(self.frame.to_string()))
    }

    async fn enter_frame(&mut self, path: &FramePath) -> Result<(), FetchError> {
        let reachable: Option<bool> = self
            .evaluate(Self::frame_script(path, "return true;"))
            .await?;
        if reachable != Some(true) {
            return Err(FetchError::Frame(path.to_string()));
        }
        self.frame = path.clone();
        Ok(())
    }

    async fn exit_to_top(&mut self) -> Result<(), FetchError> {
        self.frame = FramePath::top();
        Ok(())
    }

    fn current_frame(&self) -> &FramePath {
        &self.frame
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| FetchError::Session(format!("failed to close browser: {e}")));
        if let Err(e) = self.browser.wait().await {
            error!("[DRIVER] error while waiting for browser exit: {}", e);
        }
        self.handler.abort();
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::rendered::{WaitPolicy, fetch_rendered};

    #[test]
    fn frame_script_embeds_path() {
        let script = ChromiumSession::frame_script(&FramePath::top().child(2).child(0), "return 1;");
        assert!(script.contains("for (const index of [2,0])"));
        assert!(script.contains("return 1;"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn finds_text_inside_same_origin_iframe() {
        let settings = BrowserSettings::default();
        let mut session = ChromiumSession::launch(&settings)
            .await
            .expect("failed to launch Chromium");

        let page = "data:text/html,<p>top</p><iframe srcdoc=\"<div class='notice'>장학 안내</div>\"></iframe>";
        let nodes = fetch_rendered(&mut session, page, "notice", SelectorKind::Class, WaitPolicy::default())
            .await
            .expect("element not found");

        assert_eq!(nodes[0].text.as_deref(), Some("장학 안내"));
        assert!(session.current_frame().is_top());
        session.close().await.expect("close failed");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn close_waits_for_browser_and_stops_handler() {
        let mut session = ChromiumSession::launch(&BrowserSettings::default())
            .await
            .expect("failed to launch Chromium");

        session.close().await.expect("close failed");
        tokio::task::yield_now().await;
        assert!(session.handler.is_finished());
    }
}
