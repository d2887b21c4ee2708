use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Column names of the target table, by role.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMap {
    pub name: String,
    pub url: String,
    pub css: String,
    pub class: String,
}

/// Restricts a category to rows flagged for the months around "now".
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicMonths {
    pub offset: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub db_path: PathBuf,
    pub table: String,
    pub columns: ColumnMap,
    #[serde(default)]
    pub dynamic_months: Option<DynamicMonths>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub token: Option<String>,
    pub scholarship_channel: String,
    pub notice_channel: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_network_probe")]
    pub network_probe: String,
    pub slack: SlackConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    pub categories: HashMap<String, CategoryConfig>,
}

impl AppConfig {
    /// Slack token from the config file, falling back to `SLACK_TOKEN`.
    pub fn slack_token(&self) -> Option<String> {
        self.slack
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("SLACK_TOKEN").ok().filter(|t| !t.is_empty()))
    }
}

fn default_headless() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_keywords() -> Vec<String> {
    vec!["장학".to_string(), "지원".to_string()]
}

fn default_network_probe() -> String {
    "www.google.com:80".to_string()
}

pub fn load_config(path: &str) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// `WHERE` clause selecting rows flagged `'O'` in any month column
/// `mNN` for `current_month + offset`, wrapping around the year.
pub fn dynamic_condition(months: &DynamicMonths, current_month: u32) -> String {
    let conditions: Vec<String> = months
        .offset
        .iter()
        .map(|offset| {
            let month = (current_month as i32 + offset - 1).rem_euclid(12) + 1;
            format!("m{:02} = 'O'", month)
        })
        .collect();

    if conditions.is_empty() {
        return String::new();
    }
    format!("WHERE {}", conditions.join(" OR "))
}
