//! Free-text matching over a record's searchable fields.

use crate::models::Record;

/// Build the lowercased text a query is matched against.
///
/// Each variant contributes a fixed list of fields; absent or empty fields
/// are skipped and the rest are joined with single spaces.
pub fn searchable_text(record: &Record) -> String {
    let fields: Vec<&str> = match record {
        Record::Book(book) => vec![
            book.title.as_deref().unwrap_or_default(),
            book.subject.as_deref().unwrap_or_default(),
            book.class_label.as_deref().unwrap_or_default(),
            book.board.as_deref().unwrap_or_default(),
            book.description.as_deref().unwrap_or_default(),
            book.meta.user_name.as_deref().unwrap_or_default(),
        ],
        Record::Exchange(exchange) => vec![
            exchange.have_book.as_deref().unwrap_or_default(),
            exchange.need_book.as_deref().unwrap_or_default(),
            exchange.have_class.as_deref().unwrap_or_default(),
            exchange.need_class.as_deref().unwrap_or_default(),
            exchange.notes.as_deref().unwrap_or_default(),
        ],
        Record::Material(material) => {
            let mut fields = vec![
                material.title.as_deref().unwrap_or_default(),
                material.subject.as_deref().unwrap_or_default(),
                material.class_label.as_deref().unwrap_or_default(),
                material.description.as_deref().unwrap_or_default(),
            ];
            // Tags are space-joined like the other fields, not comma-joined
            fields.extend(material.tags.iter().map(String::as_str));
            fields
        }
    };

    fields
        .into_iter()
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether `query_lower` (already trimmed and lowercased) occurs in the
/// record's searchable text.
pub fn matches(record: &Record, query_lower: &str) -> bool {
    searchable_text(record).contains(query_lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, Exchange, Material};

    #[test]
    fn test_book_fields() {
        let record = Record::from(
            Book::new("b1")
                .title("Algebra II")
                .class_label("Class 10")
                .board("CBSE")
                .owner("Asha", "asha@example.com"),
        );
        assert_eq!(searchable_text(&record), "algebra ii class 10 cbse asha");
        assert!(matches(&record, "algebra"));
        assert!(matches(&record, "ii class"));
        // Email is not searchable
        assert!(!matches(&record, "example.com"));
    }

    #[test]
    fn test_exchange_ignores_boards() {
        let record = Record::from(
            Exchange::new("e1", "Physics Part 1", "Chemistry")
                .classes("Class 11", "Class 12")
                .boards("ICSE", "CBSE")
                .notes("Swap near campus"),
        );
        assert!(matches(&record, "chemistry"));
        assert!(matches(&record, "campus"));
        assert!(!matches(&record, "icse"));
    }

    #[test]
    fn test_material_tags() {
        let record = Record::from(
            Material::new("m1", "Optics Notes")
                .subject("Physics")
                .tag("board-exam")
                .tag("formulas"),
        );
        assert_eq!(
            searchable_text(&record),
            "optics notes physics board-exam formulas"
        );
        assert!(matches(&record, "exam formulas"));
    }

    #[test]
    fn test_empty_fields_are_skipped() {
        let record = Record::from(Book::new("b2").title("Geometry").subject(""));
        assert_eq!(searchable_text(&record), "geometry");
    }
}
