//! Search query construction.

use chrono::NaiveDate;

/// Criteria selecting which saved articles end up in the book.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    /// Lower bound of the saved date.
    pub since: NaiveDate,
    /// Articles must carry all of these labels.
    pub labels: Vec<String>,
    /// Articles must carry none of these labels.
    pub exclude_labels: Vec<String>,
    /// Raw clause appended verbatim (e.g. `language:spanish in:library`).
    pub extra: Option<String>,
}

impl SearchFilter {
    /// Filter with no label constraints.
    pub fn since(since: NaiveDate) -> Self {
        Self {
            since,
            labels: Vec::new(),
            exclude_labels: Vec::new(),
            extra: None,
        }
    }

    /// Build the service's search query string.
    ///
    /// Fixed predicates come first (inbox, saved date, unread, newest first),
    /// followed by include labels, exclude labels and the extra clause.
    pub fn to_query(&self) -> String {
        let mut parts = vec![
            "in:inbox".to_string(),
            format!("saved:{}..*", self.since.format("%Y-%m-%d")),
            "readPosition:<60".to_string(),
            "sort:saved-desc".to_string(),
        ];

        parts.extend(self.labels.iter().map(|l| format!("label:{l}")));
        parts.extend(self.exclude_labels.iter().map(|l| format!("-label:{l}")));

        if let Some(extra) = self.extra.as_deref().map(str::trim) {
            if !extra.is_empty() {
                parts.push(extra.to_string());
            }
        }

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn bare_query_has_fixed_predicates() {
        let query = SearchFilter::since(jan_first()).to_query();
        assert_eq!(
            query,
            "in:inbox saved:2024-01-01..* readPosition:<60 sort:saved-desc"
        );
    }

    #[test]
    fn query_orders_labels_exclusions_and_extra() {
        let filter = SearchFilter {
            since: jan_first(),
            labels: vec!["a".into(), "b".into()],
            exclude_labels: vec!["c".into()],
            extra: Some("language:es".into()),
        };
        let query = filter.to_query();

        let saved = query.find("saved:2024-01-01..*").expect("saved bound");
        let a = query.find(" label:a").expect("label a");
        let b = query.find(" label:b").expect("label b");
        let c = query.find(" -label:c").expect("exclude c");
        let extra = query.find("language:es").expect("extra clause");

        assert!(saved < a && a < b && b < c && c < extra);
        assert_eq!(query.matches("-label:").count(), 1);
        assert!(query.ends_with("language:es"));
    }

    #[test]
    fn blank_extra_is_ignored() {
        let filter = SearchFilter {
            extra: Some("   ".into()),
            ..SearchFilter::since(jan_first())
        };
        assert!(filter.to_query().ends_with("sort:saved-desc"));
    }
}
