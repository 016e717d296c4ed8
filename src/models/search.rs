//! Search filters, sort keys and result pages.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use super::{BookCondition, Record, RecordKind};

/// Sort key for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Newest first
    #[default]
    Recent,
    /// Cheapest first
    PriceLow,
    /// Most expensive first
    PriceHigh,
    /// Most viewed first
    Popular,
}

impl SortKey {
    pub fn id(&self) -> &'static str {
        match self {
            SortKey::Recent => "recent",
            SortKey::PriceLow => "price_low",
            SortKey::PriceHigh => "price_high",
            SortKey::Popular => "popular",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    /// Unknown keys fall back to [`SortKey::Recent`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "price_low" => SortKey::PriceLow,
            "price_high" => SortKey::PriceHigh,
            "popular" => SortKey::Popular,
            _ => SortKey::Recent,
        })
    }
}

/// Structured, non-text constraints applied to a search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    /// Only records of this kind
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<RecordKind>,

    /// Case-insensitive substring of the record's class label
    #[serde(default, rename = "class")]
    pub class_label: Option<String>,

    /// Exact examination board
    #[serde(default)]
    pub board: Option<String>,

    /// Exact condition (books only)
    #[serde(default, deserialize_with = "blank_as_none")]
    pub condition: Option<BookCondition>,

    /// Result ordering
    #[serde(default)]
    pub sort_by: SortKey,

    /// Inclusive lower price bound (books only)
    #[serde(default)]
    pub min_price: Option<f64>,

    /// Inclusive upper price bound (books only)
    #[serde(default)]
    pub max_price: Option<f64>,
}

/// Parse an optional string field, reading `null` and blank text as unset
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn non_blank(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl FilterSet {
    /// Create an empty filter set (sorted by most recent)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the category filter
    pub fn category(mut self, kind: RecordKind) -> Self {
        self.category = Some(kind);
        self
    }

    /// Set the class filter; blank values clear it
    pub fn class_label(mut self, class_label: impl Into<String>) -> Self {
        self.class_label = non_blank(class_label);
        self
    }

    /// Set the board filter; blank values clear it
    pub fn board(mut self, board: impl Into<String>) -> Self {
        self.board = non_blank(board);
        self
    }

    /// Set the condition filter
    pub fn condition(mut self, condition: BookCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the sort key
    pub fn sort_by(mut self, sort: SortKey) -> Self {
        self.sort_by = sort;
        self
    }

    /// Set the lower price bound
    pub fn min_price(mut self, min: f64) -> Self {
        self.min_price = Some(min);
        self
    }

    /// Set the upper price bound
    pub fn max_price(mut self, max: f64) -> Self {
        self.max_price = Some(max);
        self
    }

    /// Whether any constraint (other than sorting) is set
    pub fn is_active(&self) -> bool {
        self.category.is_some()
            || self.class_label.is_some()
            || self.board.is_some()
            || self.condition.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
    }
}

/// One page of ranked, filtered records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    /// Records on this page (at most one page size)
    pub items: Vec<Record>,

    /// Number of records matching the search across all pages
    pub total: usize,

    /// This page's number, starting at 1
    pub page: usize,

    /// Number of pages; 0 when nothing matched
    pub total_pages: usize,
}

impl ResultPage {
    /// A successful search with no matches
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            total_pages: 0,
        }
    }

    /// Whether the search matched nothing at all
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("price_low".parse::<SortKey>().unwrap(), SortKey::PriceLow);
        assert_eq!("price_high".parse::<SortKey>().unwrap(), SortKey::PriceHigh);
        assert_eq!("popular".parse::<SortKey>().unwrap(), SortKey::Popular);
        assert_eq!("recent".parse::<SortKey>().unwrap(), SortKey::Recent);
        assert_eq!("alphabetical".parse::<SortKey>().unwrap(), SortKey::Recent);
        assert_eq!(SortKey::default(), SortKey::Recent);
    }

    #[test]
    fn test_filter_builder_drops_blank_values() {
        let filters = FilterSet::new().class_label("  ").board("");
        assert_eq!(filters.class_label, None);
        assert_eq!(filters.board, None);
        assert!(!filters.is_active());

        let filters = FilterSet::new().class_label("10").min_price(100.0);
        assert_eq!(filters.class_label.as_deref(), Some("10"));
        assert!(filters.is_active());
    }

    #[test]
    fn test_filter_set_deserialize() {
        let filters: FilterSet = serde_json::from_str(
            r#"{"category":"book","class":"10","sortBy":"price_high","maxPrice":500}"#,
        )
        .unwrap();
        assert_eq!(filters.category, Some(RecordKind::Book));
        assert_eq!(filters.class_label.as_deref(), Some("10"));
        assert_eq!(filters.sort_by, SortKey::PriceHigh);
        assert_eq!(filters.max_price, Some(500.0));
    }

    #[test]
    fn test_blank_form_deserializes_as_unset() {
        let filters: FilterSet = serde_json::from_str(
            r#"{"category":"","class":"","board":"","condition":" ","sortBy":"recent","minPrice":null,"maxPrice":null}"#,
        )
        .unwrap();
        assert_eq!(filters.category, None);
        assert_eq!(filters.condition, None);

        let filters: FilterSet =
            serde_json::from_str(r#"{"category":"materials","condition":"Like New"}"#).unwrap();
        assert_eq!(filters.category, Some(RecordKind::Material));
        assert_eq!(filters.condition, Some(BookCondition::LikeNew));

        assert!(serde_json::from_str::<FilterSet>(r#"{"category":"magazine"}"#).is_err());
    }

    #[test]
    fn test_result_page_navigation() {
        let page = ResultPage {
            items: Vec::new(),
            total: 25,
            page: 2,
            total_pages: 3,
        };
        assert!(page.has_previous());
        assert!(page.has_next());
        assert!(!ResultPage::empty().has_next());
        assert!(ResultPage::empty().is_empty());
    }
}
