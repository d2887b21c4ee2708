// Keyword relevance partition for newly seen items

/// Splits `items` into those containing any keyword and the rest.
///
/// Matching is a case-sensitive substring test; relative order is kept on
/// both sides.
pub fn partition(keywords: &[String], items: &[String]) -> (Vec<String>, Vec<String>) {
    items
        .iter()
        .cloned()
        .partition(|item| keywords.iter().any(|keyword| item.contains(keyword.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_by_keyword_and_keeps_order() {
        let (matching, rest) = partition(&strings(&["장학"]), &strings(&["A 장학금", "B 공고"]));
        assert_eq!(matching, strings(&["A 장학금"]));
        assert_eq!(rest, strings(&["B 공고"]));
    }

    #[test]
    fn any_keyword_matches_and_nothing_is_lost() {
        let keywords = strings(&["장학", "지원"]);
        let items = strings(&["생활비 지원", "행사", "장학생 선발", "Scholarship", "지원금 장학"]);
        let (matching, rest) = partition(&keywords, &items);

        assert_eq!(matching, strings(&["생활비 지원", "장학생 선발", "지원금 장학"]));
        assert_eq!(rest, strings(&["행사", "Scholarship"]));
        assert_eq!(matching.len() + rest.len(), items.len());
    }

    #[test]
    fn matching_is_case_sensitive() {
        let (matching, rest) = partition(&strings(&["Grant"]), &strings(&["grant notice", "Grant notice"]));
        assert_eq!(matching, strings(&["Grant notice"]));
        assert_eq!(rest, strings(&["grant notice"]));
    }

    #[test]
    fn no_keywords_matches_nothing() {
        let (matching, rest) = partition(&[], &strings(&["a"]));
        assert!(matching.is_empty());
        assert_eq!(rest, strings(&["a"]));
    }
}
