//! P7: at every trie node, children stay strictly sorted by key, no matter
//! the insertion order. Unit-level sortedness checks live in `src/trie.rs`
//! alongside the implementation; this exercises it through the public
//! `Index` surface with randomized documents.

use proptest::prelude::*;
use tempfile::NamedTempFile;
use tripe::{trie, Index, Store};

fn open_store() -> (NamedTempFile, Store) {
    let file = NamedTempFile::new().unwrap();
    std::fs::remove_file(file.path()).unwrap();
    let store = Store::open(file.path(), true).unwrap();
    (file, store)
}

fn assert_all_sorted(store: &Store, node: tripe::Handle) {
    let children = trie::children(store, node).unwrap();
    let keys: Vec<u8> = children.iter().map(|(k, _)| *k).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted, "children of node {node} are not sorted");
    for (_, child) in children {
        assert_all_sorted(store, child);
    }
}

proptest! {
    #[test]
    fn children_are_sorted_after_random_documents(
        docs in prop::collection::vec("[a-e]{1,4}( [a-e]{1,4}){0,4}", 1..8)
    ) {
        let (_file, mut store) = open_store();
        let index = Index::open(&mut store).unwrap();
        for (doc_id, text) in docs.iter().enumerate() {
            index.add(&mut store, text, doc_id as u64).unwrap();
        }
        assert_all_sorted(&store, index.root());
    }
}
