//! Listing search.
//!
//! A search runs in five stages: retrieve snapshots from the store, keep
//! records containing the query text, apply the structured filters, rank,
//! and cut one page. Only retrieval is async; the other stages are pure
//! functions over the retrieved records.
//!
//! ```rust,no_run
//! use bookswap::models::{FilterSet, SortKey};
//! use bookswap::search::SearchPipeline;
//! use bookswap::store::InMemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::from_fixture_file("listings.json".as_ref())?);
//! let pipeline = SearchPipeline::new(store);
//! let filters = FilterSet::new().class_label("10").sort_by(SortKey::PriceLow);
//! let page = pipeline.search("algebra", &filters, 1).await?;
//! println!("{} of {} results", page.items.len(), page.total);
//! # Ok(())
//! # }
//! ```

pub mod filter;
pub mod matcher;
pub mod paginator;
mod pipeline;
pub mod ranker;
mod session;

pub use paginator::{paginate, RESULTS_PER_PAGE};
pub use pipeline::{SearchError, SearchPipeline, AVAILABLE, RECENT_LIMIT};
pub use session::{LatestQuery, QueryTicket, SearchSession};
