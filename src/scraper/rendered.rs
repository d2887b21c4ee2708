//! Rendered-page extraction with recursive iframe search.
//!
//! The browser session keeps a "current frame" cursor. Every frame visit goes
//! through [`with_frame`], which always puts the cursor back on the top-level
//! document before the next sibling is tried.

use crate::model::{FetchError, SelectorKind};
use crate::normalizer::RenderedNode;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

/// Position of a frame as iframe indices descending from the top document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramePath(Vec<usize>);

impl FramePath {
    pub fn top() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn is_top(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for FramePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_top() {
            return f.write_str("top");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join("/"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub top_level: Duration,
    pub in_frame: Duration,
    pub poll: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            top_level: Duration::from_secs(7),
            in_frame: Duration::from_secs(3),
            poll: Duration::from_millis(250),
        }
    }
}

/// A live page in a rendering engine.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    /// Elements matching `selector` in the current frame. An empty vector
    /// means "not present yet".
    async fn find_nodes(
        &mut self,
        selector: &str,
        kind: SelectorKind,
    ) -> Result<Vec<RenderedNode>, FetchError>;

    /// Number of iframes in the current frame.
    async fn frame_count(&mut self) -> Result<usize, FetchError>;

    async fn enter_frame(&mut self, path: &FramePath) -> Result<(), FetchError>;

    async fn exit_to_top(&mut self) -> Result<(), FetchError>;

    fn current_frame(&self) -> &FramePath;

    async fn close(&mut self) -> Result<(), FetchError>;
}

/// Enters `path`, runs `body`, and returns to the top-level document no
/// matter how `body` finished.
pub async fn with_frame<S, T, F>(session: &mut S, path: &FramePath, body: F) -> Result<T, FetchError>
where
    S: BrowserSession + ?Sized,
    F: for<'s> FnOnce(&'s mut S) -> BoxFuture<'s, Result<T, FetchError>>,
{
    let result = match session.enter_frame(path).await {
        Ok(()) => {
            info!("[RENDERED] switched to frame {}", path);
            body(session).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = session.exit_to_top().await {
        error!("[RENDERED] failed to return to top-level document: {}", e);
    }

    result
}

/// Polls until at least one element matches or `timeout` elapses.
pub async fn wait_for_nodes<S>(
    session: &mut S,
    selector: &str,
    kind: SelectorKind,
    timeout: Duration,
    poll: Duration,
) -> Result<Vec<RenderedNode>, FetchError>
where
    S: BrowserSession + ?Sized,
{
    let deadline = Instant::now() + timeout;
    loop {
        let nodes = session.find_nodes(selector, kind).await?;
        if !nodes.is_empty() {
            info!("[RENDERED] found {} elements in frame {}", nodes.len(), session.current_frame());
            return Ok(nodes);
        }

        let now = Instant::now();
        if now >= deadline {
            warn!("[RENDERED] timed out waiting for '{}' in frame {}", selector, session.current_frame());
            return Ok(Vec::new());
        }
        sleep(poll.min(deadline - now)).await;
    }
}

enum FrameVisit {
    Found(Vec<RenderedNode>),
    Nested(usize),
}

/// Loads `url` and collects matching elements, falling back to iframes.
pub async fn fetch_rendered<S>(
    session: &mut S,
    url: &str,
    selector: &str,
    kind: SelectorKind,
    policy: WaitPolicy,
) -> Result<Vec<RenderedNode>, FetchError>
where
    S: BrowserSession + ?Sized,
{
    if let Err(e) = session.navigate(url).await {
        error!("[RENDERED] navigation to {} failed: {}", url, e);
        return Err(e);
    }
    info!("[RENDERED] loaded {}", url);

    let nodes = wait_for_nodes(session, selector, kind, policy.top_level, policy.poll)
        .await
        .inspect_err(|e| error!("[RENDERED] session error: {}", e))?;
    if !nodes.is_empty() {
        return Ok(nodes);
    }

    warn!("[RENDERED] '{}' not found, searching iframes", selector);
    let count = session
        .frame_count()
        .await
        .inspect_err(|e| error!("[RENDERED] session error: {}", e))?;
    if count == 0 {
        warn!("[RENDERED] page has no iframes, giving up on '{}'", selector);
        return Err(FetchError::NoMatch(selector.to_string()));
    }

    let nodes = search_frames(session, FramePath::top(), count, selector.to_string(), kind, policy).await;
    if nodes.is_empty() {
        warn!("[RENDERED] '{}' not found in any frame", selector);
        return Err(FetchError::NoMatch(selector.to_string()));
    }
    Ok(nodes)
}

fn search_frames<'a, S>(
    session: &'a mut S,
    parent: FramePath,
    count: usize,
    selector: String,
    kind: SelectorKind,
    policy: WaitPolicy,
) -> BoxFuture<'a, Vec<RenderedNode>>
where
    S: BrowserSession + ?Sized,
{
    Box::pin(async move {
        for index in 0..count {
            let child = parent.child(index);
            let sel = selector.clone();
            let visit = with_frame(session, &child, move |s| {
                Box::pin(async move {
                    let nodes = wait_for_nodes(s, &sel, kind, policy.in_frame, policy.poll).await?;
                    if !nodes.is_empty() {
                        return Ok(FrameVisit::Found(nodes));
                    }
                    Ok(FrameVisit::Nested(s.frame_count().await?))
                })
            })
            .await;

            match visit {
                Ok(FrameVisit::Found(nodes)) => return nodes,
                Ok(FrameVisit::Nested(0)) => {}
                Ok(FrameVisit::Nested(nested)) => {
                    let nodes =
                        search_frames(session, child, nested, selector.clone(), kind, policy).await;
                    if !nodes.is_empty() {
                        return nodes;
                    }
                }
                Err(e) => error!("[RENDERED] frame {} failed: {}", child, e),
            }
        }
        Vec::new()
    })
}
