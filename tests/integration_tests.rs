//! Integration tests for the bookswap search pipeline
//!
//! These run the full retrieve, match, filter, rank and paginate flow over
//! in-memory stores.

use bookswap::models::{Book, BookCondition, Exchange, FilterSet, Material, SortKey};
use bookswap::search::{LatestQuery, SearchPipeline, SearchSession};
use bookswap::store::InMemoryStore;
use bookswap::{Record, RecordKind};
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
}

fn available_book(id: &str, title: &str) -> Book {
    Book::new(id).title(title).status("available")
}

/// Store loaded from the demo fixture shipped with the crate
fn demo_store() -> Arc<InMemoryStore> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/listings.json");
    Arc::new(InMemoryStore::from_fixture_file(&path).unwrap())
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.id()).collect()
}

fn store_with_books(count: usize) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    for i in 0..count {
        store
            .insert_record(
                available_book(&format!("b{:03}", i), &format!("Book {}", i))
                    .created_at(day(1) + chrono::Duration::minutes(i as i64)),
            )
            .unwrap();
    }
    Arc::new(store)
}

#[tokio::test]
async fn test_demo_fixture_text_search() {
    let pipeline = SearchPipeline::new(demo_store());
    let page = pipeline
        .search("physics", &FilterSet::new(), 1)
        .await
        .unwrap();

    // Newest first across every kind
    assert_eq!(page.total, 3);
    assert_eq!(ids(&page.items), vec!["b-physics", "e-phys-chem", "m-optics"]);
}

#[tokio::test]
async fn test_search_is_idempotent() {
    let pipeline = SearchPipeline::new(demo_store());
    let filters = FilterSet::new().sort_by(SortKey::PriceLow);
    let first = pipeline.search("class", &filters, 1).await.unwrap();
    let second = pipeline.search("class", &filters, 1).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_case_insensitive_substring_match() {
    let store = InMemoryStore::new();
    store
        .insert_record(available_book("b1", "Algebra II"))
        .unwrap();
    let pipeline = SearchPipeline::new(Arc::new(store));

    for query in ["algebra", "ALGEBRA", "  gebra ii "] {
        let page = pipeline.search(query, &FilterSet::new(), 1).await.unwrap();
        assert_eq!(page.total, 1, "query {:?}", query);
    }
    let page = pipeline.search("geometry", &FilterSet::new(), 1).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_pagination_covers_every_result_once() {
    for total in [0usize, 1, 9, 10, 11, 25, 99, 100] {
        let pipeline = SearchPipeline::new(store_with_books(total));
        let first = pipeline.search("", &FilterSet::new(), 1).await.unwrap();
        assert_eq!(first.total, total);
        assert_eq!(first.total_pages, total.div_ceil(10));

        let mut seen = Vec::new();
        for page in 1..=first.total_pages.max(1) {
            let result = pipeline
                .search("", &FilterSet::new(), page as i64)
                .await
                .unwrap();
            assert!(result.items.len() <= 10);
            seen.extend(result.items.iter().map(|r| r.id().to_string()));
        }

        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(seen.len(), total, "total {}", total);
        assert_eq!(unique.len(), total, "total {}", total);
    }
}

#[tokio::test]
async fn test_out_of_range_pages() {
    let pipeline = SearchPipeline::new(store_with_books(3));

    let zero = pipeline.search("", &FilterSet::new(), 0).await.unwrap();
    let one = pipeline.search("", &FilterSet::new(), 1).await.unwrap();
    assert_eq!(zero, one);
    assert_eq!(zero.page, 1);

    let negative = pipeline.search("", &FilterSet::new(), -4).await.unwrap();
    assert_eq!(negative, one);

    let beyond = pipeline.search("", &FilterSet::new(), 9999).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 3);
    assert_eq!(beyond.total_pages, 1);
}

#[tokio::test]
async fn test_filters_are_a_conjunction() {
    let store = InMemoryStore::new();
    let books = [
        ("b1", "Class 10", "CBSE", 300.0, BookCondition::Good),
        ("b2", "Class 10", "ICSE", 300.0, BookCondition::Good),
        ("b3", "Class 12", "CBSE", 300.0, BookCondition::Good),
        ("b4", "Class 10", "CBSE", 900.0, BookCondition::Good),
        ("b5", "Class 10", "CBSE", 300.0, BookCondition::Fair),
    ];
    for (id, class_label, board, price, condition) in books {
        store
            .insert_record(
                available_book(id, "Science")
                    .class_label(class_label)
                    .board(board)
                    .price(price)
                    .condition(condition),
            )
            .unwrap();
    }
    let pipeline = SearchPipeline::new(Arc::new(store));

    let filters = FilterSet::new()
        .class_label("class 10")
        .board("CBSE")
        .condition(BookCondition::Good)
        .min_price(100.0)
        .max_price(500.0);
    let page = pipeline.search("science", &filters, 1).await.unwrap();
    assert_eq!(ids(&page.items), vec!["b1"]);
}

#[tokio::test]
async fn test_price_and_condition_do_not_apply_to_other_kinds() {
    let store = InMemoryStore::new();
    store
        .insert_record(Material::new("m1", "Calculus notes").class_label("Class 12"))
        .unwrap();
    store
        .insert_record(Exchange::new("e1", "Calculus", "Statistics"))
        .unwrap();
    let pipeline = SearchPipeline::new(Arc::new(store));

    let filters = FilterSet::new()
        .min_price(100.0)
        .max_price(500.0)
        .condition(BookCondition::LikeNew);
    let page = pipeline.search("calculus", &filters, 1).await.unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn test_category_filter() {
    let pipeline = SearchPipeline::new(demo_store());
    let filters = FilterSet::new().category(RecordKind::Material);
    let page = pipeline.search("physics", &filters, 1).await.unwrap();
    assert_eq!(ids(&page.items), vec!["m-optics"]);
}

#[tokio::test]
async fn test_price_sort_puts_missing_prices_first() {
    let store = InMemoryStore::new();
    store
        .insert_record(available_book("a", "Atlas").price(50.0))
        .unwrap();
    store.insert_record(available_book("b", "Atlas")).unwrap();
    store
        .insert_record(available_book("c", "Atlas").price(200.0))
        .unwrap();
    let pipeline = SearchPipeline::new(Arc::new(store));

    let low = FilterSet::new().sort_by(SortKey::PriceLow);
    let page = pipeline.search("atlas", &low, 1).await.unwrap();
    assert_eq!(ids(&page.items), vec!["b", "a", "c"]);

    let high = FilterSet::new().sort_by(SortKey::PriceHigh);
    let page = pipeline.search("atlas", &high, 1).await.unwrap();
    assert_eq!(ids(&page.items), vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_popular_sort_is_stable() {
    let store = InMemoryStore::new();
    store
        .insert_record(available_book("x", "Biology").views(5))
        .unwrap();
    store
        .insert_record(available_book("y", "Biology").views(30))
        .unwrap();
    store
        .insert_record(available_book("z", "Biology").views(5))
        .unwrap();
    let pipeline = SearchPipeline::new(Arc::new(store));

    let filters = FilterSet::new().sort_by(SortKey::Popular);
    let page = pipeline.search("biology", &filters, 1).await.unwrap();
    assert_eq!(ids(&page.items), vec!["y", "x", "z"]);
}

#[tokio::test]
async fn test_blank_query_browses_only_available_books() {
    let pipeline = SearchPipeline::new(demo_store());
    let page = pipeline.search("   ", &FilterSet::new(), 1).await.unwrap();

    assert_eq!(page.total, 3);
    assert!(page.items.iter().all(|r| r.kind() == RecordKind::Book));
    assert!(!ids(&page.items).contains(&"b-sold"));
}

#[tokio::test]
async fn test_zero_price_is_a_price() {
    let pipeline = SearchPipeline::new(demo_store());
    let filters = FilterSet::new().max_price(0.0);
    let page = pipeline.search("", &filters, 1).await.unwrap();
    assert_eq!(ids(&page.items), vec!["b-chem"]);
}

#[tokio::test]
async fn test_failed_collection_fails_the_query() {
    let store = demo_store();
    store.fail_collection("materials");
    let pipeline = SearchPipeline::new(store.clone());

    let err = pipeline
        .search("physics", &FilterSet::new(), 1)
        .await
        .unwrap_err();
    assert_eq!(err.collection(), "materials");

    // A blank query only reads books, so it still succeeds
    assert!(pipeline.search("", &FilterSet::new(), 1).await.is_ok());

    store.restore_collection("materials");
    assert!(pipeline.search("physics", &FilterSet::new(), 1).await.is_ok());
}

#[tokio::test]
async fn test_recent_listings_are_newest_available_books() {
    let store = InMemoryStore::new();
    for d in 1..=12u32 {
        let status = if d % 4 == 0 { "sold" } else { "available" };
        store
            .insert_record(
                Book::new(format!("b{:02}", d))
                    .title("Any")
                    .status(status)
                    .created_at(day(d)),
            )
            .unwrap();
    }
    let pipeline = SearchPipeline::new(Arc::new(store));

    let page = pipeline.recent_listings(8).await.unwrap();
    assert_eq!(
        ids(&page.items),
        vec!["b11", "b10", "b09", "b07", "b06", "b05", "b03", "b02"]
    );
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn test_session_walks_pages() {
    let pipeline = SearchPipeline::new(store_with_books(25)).with_page_size(10);
    let latest = LatestQuery::new();

    let session = SearchSession::new().search("book", FilterSet::new().sort_by(SortKey::Recent));
    let ticket = latest.begin();
    let first = pipeline.run(&session).await.unwrap();
    assert!(latest.is_latest(ticket));
    assert_eq!(first.items.len(), 10);
    assert!(first.has_next());
    assert!(!first.has_previous());

    let third = pipeline
        .run(&session.next_page().next_page())
        .await
        .unwrap();
    assert_eq!(third.page, 3);
    assert_eq!(third.items.len(), 5);
    assert!(!third.has_next());

    // A newer query makes the older ticket stale
    let stale = ticket;
    let _newer = latest.begin();
    assert!(!latest.is_latest(stale));
}
