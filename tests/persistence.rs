//! P2: closing and reopening a store must not change search results.

use std::collections::HashSet;
use tempfile::NamedTempFile;
use tripe::{Index, SearchResult, Store};

fn ids(results: &[SearchResult]) -> HashSet<(u64, u64)> {
    results.iter().map(|r| (r.doc_id, r.offset)).collect()
}

#[test]
fn reopen_read_only_yields_same_results_as_staying_open() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();
    std::fs::remove_file(&path).unwrap();

    let live_results = {
        let mut store = Store::open(&path, true).unwrap();
        let index = Index::open(&mut store).unwrap();
        index.add(&mut store, "Hello world", 1).unwrap();
        index
            .add(&mut store, "A bird in the hand is worth two in the bush.", 2)
            .unwrap();
        let results = index.search(&store, "bird in the hand", false).unwrap();
        store.sync().unwrap();
        results
    };

    // Close (drop) and reopen read-only: the root trie node already exists,
    // so `Index::open` takes the non-mutating branch even on a read-only map.
    let mut store = Store::open(&path, false).unwrap();
    let index = Index::open(&mut store).unwrap();
    let reopened_results = index.search(&store, "bird in the hand", false).unwrap();

    assert_eq!(ids(&live_results), ids(&reopened_results));
    assert_eq!(ids(&reopened_results), HashSet::from([(2, 2)]));
}

#[test]
fn reopen_writable_can_add_more_documents() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();
    std::fs::remove_file(&path).unwrap();

    {
        let mut store = Store::open(&path, true).unwrap();
        let index = Index::open(&mut store).unwrap();
        index.add(&mut store, "first document", 1).unwrap();
        store.sync().unwrap();
    }
    {
        let mut store = Store::open(&path, true).unwrap();
        let index = Index::open(&mut store).unwrap();
        index.add(&mut store, "second document", 2).unwrap();
        store.sync().unwrap();
    }

    let mut store = Store::open(&path, true).unwrap();
    let index = Index::open(&mut store).unwrap();
    assert_eq!(
        index
            .search(&store, "first", false)
            .unwrap()
            .iter()
            .map(|r| r.doc_id)
            .collect::<HashSet<_>>(),
        HashSet::from([1])
    );
    assert_eq!(
        index
            .search(&store, "second", false)
            .unwrap()
            .iter()
            .map(|r| r.doc_id)
            .collect::<HashSet<_>>(),
        HashSet::from([2])
    );
}
