//! The search pipeline: retrieve, match, filter, rank, paginate.
//!
//! Every search reads whole collections from the store and does the rest in
//! memory. That holds up to a few thousand listings per collection; beyond
//! that, matching needs an indexed search service rather than a full scan.

use futures_util::future::try_join_all;
use std::sync::Arc;

use crate::models::{FilterSet, KindSet, Record, RecordKind, ResultPage};
use crate::search::session::SearchSession;
use crate::search::{filter, matcher, paginator, ranker};
use crate::store::{CollectionQuery, Direction, RecordStore, StoreError};

/// Listing status a book must have to be searchable
pub const AVAILABLE: &str = "available";

/// Number of listings shown by [`SearchPipeline::recent_listings`] by default
pub const RECENT_LIMIT: usize = 8;

/// Errors that fail a search
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A collection could not be read; no partial results are returned
    #[error("Failed to read {collection}: {source}")]
    Retrieval {
        collection: &'static str,
        #[source]
        source: StoreError,
    },
}

impl SearchError {
    /// Collection whose read failed
    pub fn collection(&self) -> &'static str {
        match self {
            SearchError::Retrieval { collection, .. } => collection,
        }
    }
}

/// Runs searches against a record store
#[derive(Debug, Clone)]
pub struct SearchPipeline {
    store: Arc<dyn RecordStore>,
    page_size: usize,
}

impl SearchPipeline {
    /// Create a pipeline with the default page size
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            page_size: paginator::RESULTS_PER_PAGE,
        }
    }

    /// Set the number of results per page (0 is treated as 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Run one search.
    ///
    /// A blank query browses available books through the filters only. Any
    /// other query reads books, exchanges and materials concurrently and
    /// keeps the records whose text contains the query and that satisfy the
    /// filters. Results are ranked by `filters.sort_by` and cut to `page`.
    pub async fn search(
        &self,
        query: &str,
        filters: &FilterSet,
        page: i64,
    ) -> Result<ResultPage, SearchError> {
        let query = query.trim().to_lowercase();

        let mut kept: Vec<Record> = if query.is_empty() {
            self.retrieve(KindSet::BOOK)
                .await?
                .into_iter()
                .filter(|record| filter::satisfies(record, filters))
                .collect()
        } else {
            self.retrieve(KindSet::all())
                .await?
                .into_iter()
                .filter(|record| matcher::matches(record, &query))
                .filter(|record| filter::satisfies(record, filters))
                .collect()
        };

        tracing::debug!(
            store = self.store.id(),
            query = %query,
            kept = kept.len(),
            "Matched and filtered records"
        );

        ranker::sort(&mut kept, filters.sort_by);
        Ok(paginator::paginate(kept, page, self.page_size))
    }

    /// Run the search described by a session
    pub async fn run(&self, session: &SearchSession) -> Result<ResultPage, SearchError> {
        self.search(&session.query, &session.filters, session.page)
            .await
    }

    /// The newest available books, newest first, as a single page
    pub async fn recent_listings(&self, limit: usize) -> Result<ResultPage, SearchError> {
        let query = CollectionQuery::new()
            .where_eq("status", AVAILABLE)
            .order_by("createdAt", Direction::Descending)
            .limit(limit);

        let records = self
            .store
            .get_collection(RecordKind::Book, &query)
            .await
            .map_err(|source| SearchError::Retrieval {
                collection: RecordKind::Book.collection(),
                source,
            })?;

        tracing::debug!(count = records.len(), "Loaded recent listings");

        let page_size = records.len();
        Ok(paginator::paginate(records, 1, page_size))
    }

    /// Read the collections for `kinds` concurrently.
    ///
    /// Records come back grouped by kind in retrieval order, each group in
    /// store order. The first failure fails the whole read.
    async fn retrieve(&self, kinds: KindSet) -> Result<Vec<Record>, SearchError> {
        let reads = kinds.kinds().map(|kind| {
            let store = Arc::clone(&self.store);
            async move {
                let query = match kind {
                    RecordKind::Book => CollectionQuery::new().where_eq("status", AVAILABLE),
                    RecordKind::Exchange | RecordKind::Material => CollectionQuery::new(),
                };
                let records = store.get_collection(kind, &query).await.map_err(|source| {
                    SearchError::Retrieval {
                        collection: kind.collection(),
                        source,
                    }
                })?;
                tracing::debug!(collection = kind.collection(), count = records.len(), "Retrieved");
                Ok::<_, SearchError>(records)
            }
        });

        let groups = try_join_all(reads).await?;
        Ok(groups.into_iter().flatten().collect())
    }
}
