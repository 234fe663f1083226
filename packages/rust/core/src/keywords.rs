//! Deterministic keyword cleanup.

use std::collections::HashSet;

/// Upper bound on keywords kept per answer.
pub const MAX_KEYWORDS: usize = 7;

/// Trim, drop empties, dedupe case-insensitively, and cap at [`MAX_KEYWORDS`].
///
/// The first occurrence of a keyword wins and keeps its original casing;
/// input order is preserved among survivors. `None` entries stand for
/// upstream values that were not strings and are dropped.
pub fn sanitize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut cleaned = Vec::new();

    for keyword in keywords.into_iter().flatten() {
        let trimmed = keyword.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if !seen.insert(trimmed.to_lowercase()) {
            continue;
        }
        cleaned.push(trimmed.to_string());
        if cleaned.len() == MAX_KEYWORDS {
            break;
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sanitize(input: &[&str]) -> Vec<String> {
        sanitize_keywords(input.iter().map(Some))
    }

    #[test]
    fn dedupe_keeps_first_casing() {
        assert_eq!(
            sanitize(&["Tree", "tree", " TREE ", "Forest"]),
            vec!["Tree", "Forest"]
        );
    }

    #[test]
    fn caps_at_seven_in_order() {
        let input: Vec<String> = (0..10).map(|i| format!("kw{i}")).collect();
        let out = sanitize_keywords(input.iter().map(Some));
        assert_eq!(out.len(), 7);
        assert_eq!(out, input[..7].to_vec());
    }

    #[test]
    fn cap_counts_survivors_not_inputs() {
        let out = sanitize(&["a", "A", " ", "b", "", "c", "d", "e", "f", "g", "h"]);
        assert_eq!(out, vec!["a", "b", "c", "d", "e", "f", "g"]);
    }

    #[test]
    fn drops_blank_and_non_string_entries() {
        let input = vec![Some("  "), None, Some("graph"), Some("\t\n"), None];
        assert_eq!(sanitize_keywords(input), vec!["graph"]);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(sanitize(&["  data structure\n"]), vec!["data structure"]);
    }

    #[test]
    fn may_return_fewer_than_three() {
        assert_eq!(sanitize(&["only", "ONLY"]), vec!["only"]);
        assert!(sanitize(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(input in proptest::collection::vec(".{0,12}", 0..16)) {
            let once = sanitize_keywords(input.iter().map(Some));
            let twice = sanitize_keywords(once.iter().map(Some));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn output_is_bounded_trimmed_and_unique(input in proptest::collection::vec("[ a-cA-C]{0,4}", 0..24)) {
            let out = sanitize_keywords(input.iter().map(Some));
            prop_assert!(out.len() <= MAX_KEYWORDS);
            let mut keys = HashSet::new();
            for kw in &out {
                prop_assert!(!kw.is_empty());
                prop_assert_eq!(kw.trim(), kw.as_str());
                prop_assert!(keys.insert(kw.to_lowercase()));
            }
        }
    }
}
