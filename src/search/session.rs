//! Caller-held search state.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::FilterSet;

/// Query text, filters and page for one browsing session.
///
/// Sessions are values: every transition returns a new session with a
/// higher generation, so a caller can tell which state a response belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSession {
    pub query: String,
    pub filters: FilterSet,
    pub page: i64,
    pub generation: u64,
}

impl SearchSession {
    /// A fresh session on page 1 with no query or filters
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Self::default()
        }
    }

    /// Start a new search; the page goes back to 1
    pub fn search(&self, query: impl Into<String>, filters: FilterSet) -> Self {
        Self {
            query: query.into(),
            filters,
            page: 1,
            generation: self.generation + 1,
        }
    }

    pub fn next_page(&self) -> Self {
        self.with_page(self.page.saturating_add(1))
    }

    /// Previous page, never below 1
    pub fn previous_page(&self) -> Self {
        self.with_page(self.page.saturating_sub(1))
    }

    /// Empty query, default filters, page 1
    pub fn cleared(&self) -> Self {
        self.search(String::new(), FilterSet::default())
    }

    fn with_page(&self, page: i64) -> Self {
        Self {
            query: self.query.clone(),
            filters: self.filters.clone(),
            page: page.max(1),
            generation: self.generation + 1,
        }
    }
}

/// Issues tickets so only the newest in-flight query's response is used
#[derive(Debug, Default)]
pub struct LatestQuery {
    issued: AtomicU64,
}

/// Proof of which query a response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket(u64);

impl LatestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new query; earlier tickets become stale
    pub fn begin(&self) -> QueryTicket {
        QueryTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` belongs to the most recently started query
    pub fn is_latest(&self, ticket: QueryTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordKind;

    #[test]
    fn test_search_resets_page() {
        let session = SearchSession::new().search("algebra", FilterSet::new());
        let session = session.next_page().next_page();
        assert_eq!(session.page, 3);

        let session = session.search("physics", FilterSet::new().category(RecordKind::Book));
        assert_eq!(session.page, 1);
        assert_eq!(session.query, "physics");
        assert_eq!(session.generation, 4);
    }

    #[test]
    fn test_previous_page_stops_at_one() {
        let session = SearchSession::new();
        assert_eq!(session.previous_page().page, 1);
        assert_eq!(session.next_page().previous_page().page, 1);
    }

    #[test]
    fn test_extreme_pages_do_not_overflow() {
        let session: SearchSession = serde_json::from_str(&format!(
            r#"{{"query":"","filters":{{}},"page":{},"generation":0}}"#,
            i64::MIN
        ))
        .unwrap();
        assert_eq!(session.previous_page().page, 1);

        let mut session = SearchSession::new();
        session.page = i64::MAX;
        assert_eq!(session.next_page().page, i64::MAX);
        assert_eq!(session.previous_page().page, i64::MAX - 1);
    }

    #[test]
    fn test_cleared() {
        let session = SearchSession::new()
            .search("algebra", FilterSet::new().board("CBSE"))
            .next_page();
        let cleared = session.cleared();
        assert_eq!(cleared.query, "");
        assert_eq!(cleared.filters, FilterSet::default());
        assert_eq!(cleared.page, 1);
        assert!(cleared.generation > session.generation);
    }

    #[test]
    fn test_latest_query_discards_stale_tickets() {
        let latest = LatestQuery::new();
        let first = latest.begin();
        assert!(latest.is_latest(first));

        let second = latest.begin();
        assert!(!latest.is_latest(first));
        assert!(latest.is_latest(second));
    }
}
