use super::traits::Extractor;
use crate::model::{ExtractionResult, FetchError, StrategyKind, Target};
use crate::normalizer::is_blank;

use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStrategy {
    pub kind: StrategyKind,
    pub selector: String,
}

#[derive(Debug)]
pub enum ChainOutcome {
    Extracted(ExtractionResult),
    /// Every candidate failed; one `(strategy, reason)` per attempt.
    Exhausted(Vec<(StrategyKind, String)>),
}

/// Cheap static fetches first, then rendered ones; CSS before class within
/// each tier.
pub fn plan(target: &Target) -> Vec<PlannedStrategy> {
    let css = target.css();
    let class = target.class();

    [
        (StrategyKind::StaticCss, css),
        (StrategyKind::StaticClass, class),
        (StrategyKind::RenderedCss, css),
        (StrategyKind::RenderedClass, class),
    ]
    .into_iter()
    .filter_map(|(kind, selector)| {
        selector.map(|selector| PlannedStrategy {
            kind,
            selector: selector.to_string(),
        })
    })
    .collect()
}

/// Tries each planned strategy in order and stops at the first non-blank
/// result.
pub async fn run_chain<E>(extractor: &mut E, url: &str, plan: &[PlannedStrategy]) -> ChainOutcome
where
    E: Extractor + ?Sized,
{
    let names: Vec<&str> = plan.iter().map(|p| p.kind.name()).collect();
    info!("Available methods: {}", names.join(" | "));

    let mut errors = Vec::new();
    for step in plan {
        let outcome = match extractor.extract(step.kind, url, &step.selector).await {
            Ok(data) if is_blank(&data) => Err(FetchError::Empty),
            other => other,
        };

        match outcome {
            Ok(data) => {
                info!("[SUCCESS] method: {} | extracted {} items", step.kind, data.len());
                return ChainOutcome::Extracted(ExtractionResult {
                    method: step.kind,
                    by: step.selector.clone(),
                    data,
                });
            }
            Err(e) => {
                error!("[ERROR] {} | {}", step.kind, e);
                errors.push((step.kind, e.to_string()));
            }
        }
    }

    ChainOutcome::Exhausted(errors)
}
