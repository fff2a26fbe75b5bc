//! Filter and pagination state for the store list.
//!
//! The view is rebuilt from command-line arguments on every invocation and
//! only turned into query parameters; nothing is cached between runs.

/// Page size used when none is given.
pub const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreListView {
    pub search: Option<String>,
    pub verified: Option<bool>,
    pub has_email: Option<bool>,
    pub state: Option<String>,
    /// One-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl Default for StoreListView {
    fn default() -> Self {
        Self {
            search: None,
            verified: None,
            has_email: None,
            state: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl StoreListView {
    /// Zero-based offset of the first row on the current page.
    #[must_use]
    pub fn skip(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.per_page.max(1))
    }

    /// Query parameters for `GET /stores`. Blank text filters are dropped.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("skip", self.skip().to_string()),
            ("limit", self.per_page.max(1).to_string()),
        ];
        if let Some(search) = non_blank(self.search.as_deref()) {
            pairs.push(("search", search.to_owned()));
        }
        if let Some(verified) = self.verified {
            pairs.push(("verified", verified.to_string()));
        }
        if let Some(has_email) = self.has_email {
            pairs.push(("has_email", has_email.to_string()));
        }
        if let Some(state) = non_blank(self.state.as_deref()) {
            pairs.push(("state", state.to_owned()));
        }
        pairs
    }

    /// Whether a page with `rows` results may be followed by another.
    #[must_use]
    pub fn has_next_page(&self, rows: usize) -> bool {
        u32::try_from(rows).is_ok_and(|rows| rows >= self.per_page.max(1))
    }

    /// One-line summary of the active filters, e.g. `page 2 | search "video"`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("page {}", self.page.max(1))];
        if let Some(search) = non_blank(self.search.as_deref()) {
            parts.push(format!("search \"{search}\""));
        }
        if let Some(verified) = self.verified {
            parts.push(if verified { "verified" } else { "unverified" }.to_owned());
        }
        if let Some(has_email) = self.has_email {
            parts.push(if has_email { "with email" } else { "without email" }.to_owned());
        }
        if let Some(state) = non_blank(self.state.as_deref()) {
            parts.push(format!("state {state}"));
        }
        parts.join(" | ")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_view_is_first_unfiltered_page() {
        let view = StoreListView::default();
        assert_eq!(view.skip(), 0);
        assert_eq!(
            view.query_pairs(),
            vec![("skip", "0".to_owned()), ("limit", "20".to_owned())]
        );
        assert_eq!(view.describe(), "page 1");
    }

    #[test]
    fn page_number_becomes_offset() {
        let view = StoreListView {
            page: 3,
            per_page: 25,
            ..StoreListView::default()
        };
        assert_eq!(view.skip(), 50);
    }

    #[test]
    fn page_zero_is_treated_as_first_page() {
        let view = StoreListView {
            page: 0,
            ..StoreListView::default()
        };
        assert_eq!(view.skip(), 0);
    }

    #[test]
    fn email_filter_is_independent_of_verified() {
        let view = StoreListView {
            has_email: Some(true),
            ..StoreListView::default()
        };
        let pairs = view.query_pairs();
        assert!(pairs.contains(&("has_email", "true".to_owned())));
        assert!(!pairs.iter().any(|(key, _)| *key == "verified"));
    }

    #[test]
    fn blank_text_filters_are_dropped() {
        let view = StoreListView {
            search: Some("   ".to_owned()),
            state: Some(String::new()),
            ..StoreListView::default()
        };
        assert_eq!(view.query_pairs().len(), 2);
    }

    #[test]
    fn describe_lists_active_filters() {
        let view = StoreListView {
            search: Some("video".to_owned()),
            verified: Some(false),
            state: Some("TX".to_owned()),
            page: 2,
            ..StoreListView::default()
        };
        assert_eq!(
            view.describe(),
            "page 2 | search \"video\" | unverified | state TX"
        );
    }

    #[test]
    fn full_page_suggests_more_rows() {
        let view = StoreListView {
            per_page: 2,
            ..StoreListView::default()
        };
        assert!(view.has_next_page(2));
        assert!(!view.has_next_page(1));
    }
}
