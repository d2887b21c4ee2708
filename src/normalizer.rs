// Text extraction and whitespace normalization for static and rendered elements
use scraper::ElementRef;

/// Anything that can hand back its visible text.
///
/// Returning `None` means the element exposes no text at all; such elements
/// are dropped from the result instead of producing an empty entry.
pub trait TextSource {
    fn extract_text(&self) -> Option<String>;
}

impl TextSource for ElementRef<'_> {
    fn extract_text(&self) -> Option<String> {
        Some(self.text().collect::<String>())
    }
}

/// Element captured from the rendered DOM. `text` is `None` when the node
/// has no `innerText` (e.g. SVG content).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNode {
    pub text: Option<String>,
}

impl TextSource for RenderedNode {
    fn extract_text(&self) -> Option<String> {
        self.text.clone()
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_elements<T: TextSource>(elements: &[T]) -> Vec<String> {
    elements
        .iter()
        .filter_map(|element| element.extract_text())
        .map(|text| collapse_whitespace(&text))
        .collect()
}

/// True when nothing usable was extracted.
pub fn is_blank(data: &[String]) -> bool {
    data.iter().all(|item| item.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn collapses_newlines_tabs_and_runs_of_spaces() {
        assert_eq!(
            collapse_whitespace("  2025학년도\n\t1학기   장학금\u{a0} 안내 "),
            "2025학년도 1학기 장학금 안내"
        );
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }

    #[test]
    fn normalizes_static_nodes_in_document_order() {
        let html = Html::parse_fragment(
            "<ul><li> 첫 번째\n 공지 </li><li><a>두 번째</a>   공지</li></ul>",
        );
        let selector = Selector::parse("li").unwrap();
        let elements: Vec<_> = html.select(&selector).collect();

        assert_eq!(
            normalize_elements(&elements),
            vec!["첫 번째 공지".to_string(), "두 번째 공지".to_string()]
        );
    }

    #[test]
    fn skips_rendered_nodes_without_text() {
        let nodes = vec![
            RenderedNode { text: Some("A\n장학".into()) },
            RenderedNode { text: None },
            RenderedNode { text: Some("  ".into()) },
        ];
        let data = normalize_elements(&nodes);

        assert_eq!(data, vec!["A 장학".to_string(), String::new()]);
        assert!(!is_blank(&data));
        assert!(is_blank(&data[1..]));
        assert!(is_blank(&[]));
    }
}
