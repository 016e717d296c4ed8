//! Fixed-size pagination.

use crate::models::{Record, ResultPage};

/// Default number of results per page
pub const RESULTS_PER_PAGE: usize = 10;

/// Cut one page out of ranked records.
///
/// Pages start at 1; lower values are clamped to 1 and a page size of 0 is
/// treated as 1. A page past the end comes back empty but still reports the
/// totals.
pub fn paginate(ranked: Vec<Record>, page: i64, page_size: usize) -> ResultPage {
    let page_size = page_size.max(1);
    let page = usize::try_from(page.max(1)).unwrap_or(usize::MAX);
    let total = ranked.len();
    let total_pages = total.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let items = if start >= total {
        Vec::new()
    } else {
        ranked.into_iter().skip(start).take(page_size).collect()
    };

    ResultPage {
        items,
        total,
        page,
        total_pages,
    }
}
