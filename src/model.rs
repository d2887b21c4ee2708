// Core structs: Target, Snapshot, UniqueDelta, error records and run summary
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One row of the target source: a page to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub url: String,
    pub css_selector: Option<String>,
    pub class_name: Option<String>,
}

impl Target {
    /// Selector hint for CSS-based strategies, ignoring blank values.
    pub fn css(&self) -> Option<&str> {
        self.css_selector.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Class-name hint for class-based strategies, ignoring blank values.
    pub fn class(&self) -> Option<&str> {
        self.class_name.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn is_valid(&self) -> bool {
        !self.url.trim().is_empty() && (self.css().is_some() || self.class().is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Css,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    // Aliases accept snapshots written by the earlier bs4/selenium tool.
    #[serde(alias = "bs4_css")]
    StaticCss,
    #[serde(alias = "bs4_class")]
    StaticClass,
    #[serde(alias = "selenium_css")]
    RenderedCss,
    #[serde(alias = "selenium_class")]
    RenderedClass,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::StaticCss => "static_css",
            StrategyKind::StaticClass => "static_class",
            StrategyKind::RenderedCss => "rendered_css",
            StrategyKind::RenderedClass => "rendered_class",
        }
    }

    pub fn selector_kind(&self) -> SelectorKind {
        match self {
            StrategyKind::StaticCss | StrategyKind::RenderedCss => SelectorKind::Css,
            StrategyKind::StaticClass | StrategyKind::RenderedClass => SelectorKind::Class,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, StrategyKind::RenderedCss | StrategyKind::RenderedClass)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized texts produced by the first strategy that succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub method: StrategyKind,
    pub by: String,
    pub data: Vec<String>,
}

/// Last persisted extraction for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub method: StrategyKind,
    pub by: String,
    pub last_update_date: String,
    #[serde(default)]
    pub data: Vec<String>,
}

/// Items seen for the first time, carrying the new snapshot's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueDelta {
    pub method: StrategyKind,
    pub by: String,
    pub last_update_date: String,
    pub data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Unchanged,
    Changed(UniqueDelta),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    #[serde(skip)]
    pub target: String,
    #[serde(rename = "type")]
    pub strategy: String,
    pub description: String,
}

/// Target name → error records, in the order targets first failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorMap {
    entries: Vec<(String, Vec<ErrorRecord>)>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: &str, strategy: &str, description: impl Into<String>) {
        let record = ErrorRecord {
            target: target.to_string(),
            strategy: strategy.to_string(),
            description: description.into(),
        };
        match self.entries.iter_mut().find(|(name, _)| name == target) {
            Some((_, records)) => records.push(record),
            None => self.entries.push((target.to_string(), vec![record])),
        }
    }

    #[cfg(test)]
    pub fn get(&self, target: &str) -> Option<&[ErrorRecord]> {
        self.entries
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, records)| records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ErrorRecord])> {
        self.entries
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, records) in &self.entries {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetOutcome {
    ConfigInvalid,
    ExtractionFailed,
    PersistenceFailed,
    Unchanged,
    Delivered { matched: usize, unmatched: usize },
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetOutcome::Unchanged | TargetOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub total_targets: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("invalid selector '{0}'")]
    Selector(String),
    #[error("no elements matched '{0}'")]
    NoMatch(String),
    #[error("extracted text is empty")]
    Empty,
    #[error("browser session error: {0}")]
    Session(String),
    #[error("frame {0} is not accessible")]
    Frame(String),
    #[error("browser is not available")]
    Unavailable,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("missing column '{0}'")]
    MissingColumn(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("slack api error: {0}")]
    Api(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("slack token is not configured")]
    MissingToken,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("unknown category key '{0}'")]
    UnknownCategory(String),
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("browser initialization failed: {0}")]
    Browser(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("target source error: {0}")]
    TargetSource(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str, css: Option<&str>, class: Option<&str>) -> Target {
        Target {
            name: "org".into(),
            url: url.into(),
            css_selector: css.map(String::from),
            class_name: class.map(String::from),
        }
    }

    #[test]
    fn target_requires_url_and_a_selector_hint() {
        assert!(target("https://a.kr", Some("td a"), None).is_valid());
        assert!(target("https://a.kr", None, Some("title")).is_valid());
        assert!(!target("", Some("td a"), None).is_valid());
        assert!(!target("https://a.kr", None, None).is_valid());
        assert!(!target("https://a.kr", Some("  "), Some("")).is_valid());
    }

    #[test]
    fn error_map_keeps_target_order_and_serializes_type_field() {
        let mut errors = ErrorMap::new();
        errors.add("b", "static_css", "timeout");
        errors.add("a", "general", "missing url");
        errors.add("b", "rendered_css", "no match");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("b").map(|r| r.len()), Some(2));

        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(
            json,
            r#"{"b":[{"type":"static_css","description":"timeout"},{"type":"rendered_css","description":"no match"}],"a":[{"type":"general","description":"missing url"}]}"#
        );
    }

    #[test]
    fn snapshot_uses_strategy_names_on_disk() {
        let snapshot = Snapshot {
            method: StrategyKind::RenderedClass,
            by: "board-title".into(),
            last_update_date: "2025-03-01 09:00:00".into(),
            data: vec!["공고".into()],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["method"], "rendered_class");
        assert_eq!(json["last_update_date"], "2025-03-01 09:00:00");
    }
}
