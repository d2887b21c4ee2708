// Slack message bodies for run notices, deliveries and digests
use crate::model::{ErrorMap, RunSummary};

pub fn opening(key: &str, started_at: &str) -> String {
    format!(":white_check_mark:   {} | {} crawl started", started_at, key)
}

/// New relevant items for one organization.
pub fn delivery(org_name: &str, url: &str, items: &[String]) -> String {
    format!(":arrow_forward: *{}*\n{}\n{}", org_name, url, items.join("\n"))
}

pub fn summary(key: &str, date: &str, summary: &RunSummary) -> String {
    format!(
        "📊 *{} crawl summary ({})*\n\
         > *Targets*: `{}`\n\
         > *Succeeded*: `{}`\n\
         > *Failed*: `{}`\n\
         > *Elapsed*: `{:.2}`s ⏱️\n",
        key,
        date,
        summary.total_targets,
        summary.success_count,
        summary.failure_count,
        summary.elapsed_seconds
    )
}

/// Failed targets with every recorded reason, numbered in failure order.
pub fn failure_digest(key: &str, errors: &ErrorMap) -> String {
    let sections: Vec<String> = errors
        .iter()
        .enumerate()
        .map(|(i, (name, records))| {
            let reasons: Vec<String> = records
                .iter()
                .map(|r| format!("- [{}] {}", r.strategy, r.description))
                .collect();
            format!("{} ({}):\n{}", name, i + 1, reasons.join("\n"))
        })
        .collect();

    format!(
        ":warning: {} crawl failures ({})\n\n{}",
        key,
        errors.len(),
        sections.join("\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_lists_items_under_name_and_link() {
        let text = delivery("A재단", "https://a.or.kr", &["장학생 모집".into(), "지원 사업".into()]);
        assert_eq!(text, ":arrow_forward: *A재단*\nhttps://a.or.kr\n장학생 모집\n지원 사업");
    }

    #[test]
    fn summary_shows_counters() {
        let text = summary(
            "univ",
            "2025-03-02",
            &RunSummary {
                total_targets: 3,
                success_count: 1,
                failure_count: 2,
                elapsed_seconds: 4.256,
            },
        );
        assert!(text.contains("*Targets*: `3`"));
        assert!(text.contains("*Succeeded*: `1`"));
        assert!(text.contains("*Failed*: `2`"));
        assert!(text.contains("`4.26`s"));
    }

    #[test]
    fn digest_groups_reasons_per_target() {
        let mut errors = ErrorMap::new();
        errors.add("A", "general", "missing url");
        errors.add("B", "static_css", "timeout");
        errors.add("B", "rendered_css", "no match");

        let text = failure_digest("univ", &errors);
        assert!(text.starts_with(":warning: univ crawl failures (2)"));
        assert!(text.contains("A (1):\n- [general] missing url"));
        assert!(text.contains("B (2):\n- [static_css] timeout\n- [rendered_css] no match"));
    }
}
