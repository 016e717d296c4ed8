//! Structured filter evaluation.

use crate::models::{FilterSet, Record};

fn is_set(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Whether `record` satisfies every constraint in `filters`.
///
/// Condition and price constraints only apply to books; other kinds pass
/// them. A book without a price passes any price range. A price of 0 is a
/// real price and a bound of 0 is a real bound: free books fail a
/// `min_price` above 0, and `max_price = 0` keeps only free books.
pub fn satisfies(record: &Record, filters: &FilterSet) -> bool {
    if let Some(category) = filters.category {
        if record.kind() != category {
            return false;
        }
    }

    if let Some(class_label) = is_set(&filters.class_label) {
        let wanted = class_label.to_lowercase();
        match record.class_label() {
            Some(actual) if actual.to_lowercase().contains(&wanted) => {}
            _ => return false,
        }
    }

    if let Some(board) = is_set(&filters.board) {
        if record.board() != Some(board) {
            return false;
        }
    }

    if let Record::Book(book) = record {
        if let Some(condition) = filters
            .condition
            .as_ref()
            .filter(|c| !c.name().trim().is_empty())
        {
            if book.condition.as_ref() != Some(condition) {
                return false;
            }
        }

        if let Some(price) = book.price {
            if filters.min_price.is_some_and(|min| price < min) {
                return false;
            }
            if filters.max_price.is_some_and(|max| price > max) {
                return false;
            }
        }
    }

    true
}
