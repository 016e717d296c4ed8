//! Core data models for listings, search requests and user accounts.

mod record;
mod search;
mod user;

pub use record::{
    Book, BookCondition, Exchange, KindSet, Material, Record, RecordKind, RecordMeta,
    UnknownRecordKind,
};
pub use search::{FilterSet, ResultPage, SortKey};
pub use user::{Avatar, SignupDetails, UserProfile};
