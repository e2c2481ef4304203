//! End-to-end indexing: pagination, hash-based skip, force reindex, and
//! continue-on-error aggregation over a real SQLite store.

mod common;

use common::{item, shoe_item, FailingProvider, MockProvider, TruncatingProvider};
use tempfile::TempDir;
use vecsearch::catalog::{Catalog, SqliteCatalog};
use vecsearch::indexer::Indexer;
use vecsearch::storage::{open_store, Database, EmbeddingStore};

const DIM: usize = 8;

fn fixture(items: &[vecsearch::catalog::Item]) -> (SqliteCatalog, Box<dyn EmbeddingStore>, TempDir)
{
    let temp = TempDir::new().unwrap();
    let db = Database::open(&temp.path().join("test.db")).unwrap();
    let store = open_store(&db, DIM);

    let catalog = SqliteCatalog::new(db.pool().clone());
    catalog.upsert_items(items).unwrap();

    (catalog, store, temp)
}

#[test]
fn indexes_every_item_once() {
    let items: Vec<_> = (0..5)
        .map(|i| item(&format!("item-{}", i), &format!("Product {}", i)))
        .collect();
    let (catalog, store, _temp) = fixture(&items);
    let provider = MockProvider::new(DIM);

    let report = Indexer::new(&catalog, &provider, store.as_ref())
        .run(2, false)
        .unwrap();

    assert_eq!(report.total_items, 5);
    assert_eq!(report.indexed, 5);
    assert_eq!(report.errors, 0);
    assert_eq!(report.batch_size, 2);
    assert_eq!(store.count().unwrap(), 5);
    // 5 items in pages of 2 -> 3 batch embedding calls
    assert_eq!(provider.batch_calls(), 3);
}

#[test]
fn unchanged_items_skip_the_provider() {
    let (catalog, store, _temp) = fixture(&[shoe_item(), item("a", "Widget")]);
    let provider = MockProvider::new(DIM);
    let indexer = Indexer::new(&catalog, &provider, store.as_ref());

    let first = indexer.run(10, false).unwrap();
    assert_eq!(first.indexed, 2);
    assert_eq!(provider.batch_calls(), 1);

    // Second run: hashes match, zero provider calls
    let second = indexer.run(10, false).unwrap();
    assert_eq!(second.indexed, 0);
    assert_eq!(second.errors, 0);
    assert_eq!(provider.batch_calls(), 1);
}

#[test]
fn changed_content_is_reindexed() {
    let (catalog, store, _temp) = fixture(&[item("a", "Widget")]);
    let provider = MockProvider::new(DIM);
    let indexer = Indexer::new(&catalog, &provider, store.as_ref());

    indexer.run(10, false).unwrap();

    // Rename changes the normalized text, hence the hash
    catalog.upsert_items(&[item("a", "Improved Widget")]).unwrap();

    let report = indexer.run(10, false).unwrap();
    assert_eq!(report.indexed, 1);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn force_always_embeds_and_keeps_one_record() {
    let (catalog, store, _temp) = fixture(&[shoe_item()]);
    let provider = MockProvider::new(DIM);
    let indexer = Indexer::new(&catalog, &provider, store.as_ref());

    indexer.run(10, false).unwrap();
    assert_eq!(provider.batch_calls(), 1);

    let forced = indexer.run(10, true).unwrap();
    assert_eq!(forced.indexed, 1);
    assert_eq!(provider.batch_calls(), 2);

    // Exactly one live record per (item_id, item_version_id)
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn failed_page_counts_errors_and_continues() {
    let items: Vec<_> = (0..6)
        .map(|i| item(&format!("item-{}", i), &format!("Product {}", i)))
        .collect();
    let (catalog, store, _temp) = fixture(&items);
    let provider = FailingProvider::new(DIM);

    // Three pages of 2; each fails as a whole, none aborts the run
    let report = Indexer::new(&catalog, &provider, store.as_ref())
        .run(2, false)
        .unwrap();

    assert_eq!(report.total_items, 6);
    assert_eq!(report.indexed, 0);
    assert_eq!(report.errors, 6);
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn short_embedding_batch_fails_the_page() {
    let items: Vec<_> = (0..3)
        .map(|i| item(&format!("item-{}", i), &format!("Product {}", i)))
        .collect();
    let (catalog, store, _temp) = fixture(&items);
    let provider = TruncatingProvider::new(DIM);

    // 2 vectors come back for 3 inputs: nothing is written, every item on
    // the page counts as an error, the run still completes
    let report = Indexer::new(&catalog, &provider, store.as_ref())
        .run(10, false)
        .unwrap();

    assert_eq!(report.total_items, 3);
    assert_eq!(report.indexed, 0);
    assert_eq!(report.errors, 3);
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn empty_catalog_yields_empty_report() {
    let (catalog, store, _temp) = fixture(&[]);
    let provider = MockProvider::new(DIM);

    let report = Indexer::new(&catalog, &provider, store.as_ref())
        .run(10, false)
        .unwrap();

    assert_eq!(report.total_items, 0);
    assert_eq!(report.indexed, 0);
    assert_eq!(provider.batch_calls(), 0);
}

#[test]
fn record_carries_normalized_text_and_model() {
    let (catalog, store, _temp) = fixture(&[shoe_item()]);
    let provider = MockProvider::new(DIM);

    Indexer::new(&catalog, &provider, store.as_ref())
        .run(10, false)
        .unwrap();

    let mut seen = Vec::new();
    store
        .scan(&mut |row| {
            seen.push(row);
            Ok(())
        })
        .unwrap();

    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].content_text,
        "Red Running Shoe Lightweight mesh upper Acme Shoes Red Color"
    );
    assert_eq!(seen[0].embedding.len(), DIM);
}

#[test]
fn pagination_visits_every_item_exactly_once() {
    let items: Vec<_> = (0..23)
        .map(|i| item(&format!("item-{:02}", i), &format!("Product {}", i)))
        .collect();
    let (catalog, store, _temp) = fixture(&items);
    let provider = MockProvider::new(DIM);

    let report = Indexer::new(&catalog, &provider, store.as_ref())
        .run(10, false)
        .unwrap();

    assert_eq!(report.indexed, 23);
    assert_eq!(store.count().unwrap(), 23);

    // Catalog pagination itself: pages cover the set without overlap
    let page = catalog.page(20, 10).unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 23);
}
