use crate::model::{FetchError, StrategyKind};

/// Runs one extraction strategy against a page and returns normalized texts.
#[async_trait::async_trait]
pub trait Extractor: Send {
    async fn extract(
        &mut self,
        kind: StrategyKind,
        url: &str,
        selector: &str,
    ) -> Result<Vec<String>, FetchError>;
}
