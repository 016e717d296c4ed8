//! Result ordering.

use chrono::{DateTime, Utc};

use crate::models::{Record, SortKey};

fn price(record: &Record) -> f64 {
    record.price().unwrap_or(0.0)
}

fn created(record: &Record) -> DateTime<Utc> {
    record.created_at().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn views(record: &Record) -> u64 {
    record.views().unwrap_or(0)
}

/// Sort records in place by `sort`.
///
/// The sort is stable: ties keep their incoming order.
pub fn sort(records: &mut [Record], sort: SortKey) {
    match sort {
        SortKey::PriceLow => records.sort_by(|a, b| price(a).total_cmp(&price(b))),
        SortKey::PriceHigh => records.sort_by(|a, b| price(b).total_cmp(&price(a))),
        SortKey::Recent => records.sort_by(|a, b| created(b).cmp(&created(a))),
        SortKey::Popular => records.sort_by(|a, b| views(b).cmp(&views(a))),
    }
}
