//! # bookswap
//!
//! Search and account tooling for a student book marketplace whose listings
//! live in Cloud Firestore: books for sale, book exchange offers and shared
//! study material.
//!
//! ## Architecture
//!
//! - [`models`]: listing records, filters, result pages and user profiles
//! - [`store`]: document stores (Firestore REST and in-memory fixtures)
//! - [`search`]: the retrieve, match, filter, rank and paginate pipeline
//! - [`auth`]: signup and login against the hosted identity service
//! - [`config`]: configuration management
//! - [`ui`] and [`utils`]: terminal rendering and shared helpers

pub mod auth;
pub mod config;
pub mod models;
pub mod search;
pub mod store;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{FilterSet, Record, RecordKind, ResultPage, SortKey};
pub use search::{SearchError, SearchPipeline, SearchSession};
pub use store::{FirestoreStore, InMemoryStore, RecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
