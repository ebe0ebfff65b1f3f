//! Query normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year pattern"));

/// A user query split into the form used for searching and the form kept
/// for ranking context.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// The query exactly as the user typed it.
    pub raw: String,
    /// Year token stripped, lower-cased; what the search endpoints see.
    pub normalized: String,
    /// A four-digit year found in the query, if any.
    pub year: Option<String>,
}

impl SearchQuery {
    pub fn parse(raw: &str) -> Self {
        let year = YEAR_RE.find(raw).map(|m| m.as_str().to_string());
        let mut words: Vec<&str> = raw.split_whitespace().collect();
        if let Some(year) = year.as_deref() {
            if let Some(pos) = words.iter().position(|w| *w == year) {
                words.remove(pos);
            }
        }
        let normalized = words.join(" ").trim().to_lowercase();
        Self {
            raw: raw.to_string(),
            normalized,
            year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_is_extracted_and_stripped() {
        let query = SearchQuery::parse("Q4 2024 financial report");
        assert_eq!(query.year.as_deref(), Some("2024"));
        assert_eq!(query.normalized, "q4 financial report");
        assert_eq!(query.raw, "Q4 2024 financial report");
    }

    #[test]
    fn no_year_just_lowercases() {
        let query = SearchQuery::parse("Onboarding Checklist");
        assert!(query.year.is_none());
        assert_eq!(query.normalized, "onboarding checklist");
    }

    #[test]
    fn embedded_year_is_found_but_only_standalone_words_are_removed() {
        // "FY2023" matches nothing standalone, so the word list is intact.
        let query = SearchQuery::parse("FY2023 budget");
        assert!(query.year.is_none());
        assert_eq!(query.normalized, "fy2023 budget");

        let query = SearchQuery::parse("budget 1999 draft");
        assert_eq!(query.year.as_deref(), Some("1999"));
        assert_eq!(query.normalized, "budget draft");
    }

    #[test]
    fn year_only_query_normalizes_to_empty() {
        let query = SearchQuery::parse("2024");
        assert_eq!(query.year.as_deref(), Some("2024"));
        assert_eq!(query.normalized, "");
    }
}
