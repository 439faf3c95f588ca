//! Trie node layer. A node's payload is exactly two handles: a matches array
//! and a children array. See spec §4.2.

use crate::{Handle, Result, Store, TripeError};

/// A node's `(matches, children)` handle pair, with the invariant (I3) that
/// the backing block is exactly two u64s. `pub(crate)` so free-list-vs-
/// reachable-set tests (spec P6) can see the raw array handles, which the
/// public `children`/`matches` accessors deliberately don't expose.
pub(crate) fn load_node(store: &Store, node: Handle) -> Result<(Handle, Handle)> {
    let nums = store.load_numbers(node)?;
    if nums.len() != 2 {
        return Err(TripeError::Corrupt(format!(
            "trie node at {} has {} numbers, expected 2",
            node.0,
            nums.len()
        )));
    }
    Ok((Handle(nums[0]), Handle(nums[1])))
}

fn write_node(store: &mut Store, node: Handle, matches: Handle, children: Handle) -> Result<()> {
    store.update_numbers(node, &[matches.0, children.0])
}

pub fn new_node(store: &mut Store) -> Result<Handle> {
    store.store_numbers(&[0, 0])
}

/// `(byte_key, child_handle)` pairs for `node`, sorted ascending by key (I4).
pub fn children(store: &Store, node: Handle) -> Result<Vec<(u8, Handle)>> {
    let (_, children_handle) = load_node(store, node)?;
    if children_handle.is_null() {
        return Ok(Vec::new());
    }
    let flat = store.load_numbers(children_handle)?;
    Ok(flat
        .chunks_exact(2)
        .map(|pair| (pair[0] as u8, Handle(pair[1])))
        .collect())
}

/// The term-instance handles filed directly at `node` (insertion order).
pub fn matches(store: &Store, node: Handle) -> Result<Vec<Handle>> {
    let (matches_handle, _) = load_node(store, node)?;
    if matches_handle.is_null() {
        return Ok(Vec::new());
    }
    Ok(store
        .load_numbers(matches_handle)?
        .into_iter()
        .map(Handle)
        .collect())
}

/// Binary search for `byte` in the flattened, sorted `(key, child)` pairs.
fn binary_search(pairs: &[u64], byte: u8) -> core::result::Result<usize, usize> {
    let n = pairs.len() / 2;
    let key = byte as u64;
    let mut lo = 0usize;
    let mut hi = n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match pairs[mid * 2].cmp(&key) {
            core::cmp::Ordering::Less => lo = mid + 1,
            core::cmp::Ordering::Greater => hi = mid,
            core::cmp::Ordering::Equal => return Ok(mid),
        }
    }
    Err(lo)
}

/// Descend one byte from `node`. Returns `Handle::NULL` if there is no such
/// child.
pub fn descend(store: &Store, node: Handle, byte: u8) -> Result<Handle> {
    let (_, children_handle) = load_node(store, node)?;
    if children_handle.is_null() {
        return Ok(Handle::NULL);
    }
    let pairs = store.load_numbers(children_handle)?;
    match binary_search(&pairs, byte) {
        Ok(index) => Ok(Handle(pairs[index * 2 + 1])),
        Err(_) => Ok(Handle::NULL),
    }
}

/// Descends `key_bytes` from `node`, returning the matches filed at the
/// final node, or an empty set if any byte has no child (spec §4.2
/// `search`). Implemented iteratively per the design notes in spec §9, so
/// stack depth does not grow with key length.
pub fn search(store: &Store, node: Handle, key_bytes: &[u8]) -> Result<Vec<Handle>> {
    let mut current = node;
    for &byte in key_bytes {
        current = descend(store, current, byte)?;
        if current.is_null() {
            return Ok(Vec::new());
        }
    }
    matches(store, current)
}

/// Descends one byte from `node`, creating the child if absent. Splices the
/// new `(byte, child)` pair into the children array preserving sort order,
/// replaces the node's children handle in place, and frees the old children
/// array.
fn descend_or_create(store: &mut Store, node: Handle, byte: u8) -> Result<Handle> {
    let (matches_handle, children_handle) = load_node(store, node)?;
    let pairs = if children_handle.is_null() {
        Vec::new()
    } else {
        store.load_numbers(children_handle)?
    };

    match binary_search(&pairs, byte) {
        Ok(index) => Ok(Handle(pairs[index * 2 + 1])),
        Err(index) => {
            let child = new_node(store)?;
            let mut new_pairs = pairs;
            new_pairs.splice(index * 2..index * 2, [byte as u64, child.0]);
            let new_children_handle = store.store_numbers(&new_pairs)?;
            write_node(store, node, matches_handle, new_children_handle)?;
            if !children_handle.is_null() {
                store.free(children_handle)?;
            }
            Ok(child)
        }
    }
}

/// Inserts `term_instance` at the node reached by descending `key_bytes`
/// from `node`, creating intermediate nodes as needed (spec §4.2 `add`).
pub fn add(store: &mut Store, node: Handle, key_bytes: &[u8], term_instance: Handle) -> Result<()> {
    let mut current = node;
    for &byte in key_bytes {
        current = descend_or_create(store, current, byte)?;
    }

    let (matches_handle, children_handle) = load_node(store, current)?;
    let mut list = if matches_handle.is_null() {
        Vec::new()
    } else {
        store.load_numbers(matches_handle)?
    };
    list.push(term_instance.0);
    let new_matches_handle = store.store_numbers(&list)?;
    write_node(store, current, new_matches_handle, children_handle)?;
    if !matches_handle.is_null() {
        store.free(matches_handle)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use tempfile::NamedTempFile;

    fn open_store() -> (NamedTempFile, Store) {
        let file = NamedTempFile::new().unwrap();
        std::fs::remove_file(file.path()).unwrap();
        let store = Store::open(file.path(), true).unwrap();
        (file, store)
    }

    #[test]
    fn children_stay_sorted() {
        let (_file, mut store) = open_store();
        let root = new_node(&mut store).unwrap();
        for byte in [b'z', b'a', b'm', b'b', b'y'] {
            descend_or_create(&mut store, root, byte).unwrap();
        }
        let keys: Vec<u8> = children(&store, root).unwrap().into_iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn duplicate_keys_append_matches() {
        let (_file, mut store) = open_store();
        let root = new_node(&mut store).unwrap();
        let a = store.store_numbers(&[1, 2, 3, 4]).unwrap();
        let b = store.store_numbers(&[5, 6, 7, 8]).unwrap();
        add(&mut store, root, b"hi", a).unwrap();
        add(&mut store, root, b"hi", b).unwrap();
        let found = search(&store, root, b"hi").unwrap();
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn missing_key_returns_empty() {
        let (_file, mut store) = open_store();
        let root = new_node(&mut store).unwrap();
        let a = store.store_numbers(&[1, 2, 3, 4]).unwrap();
        add(&mut store, root, b"hi", a).unwrap();
        assert!(search(&store, root, b"bye").unwrap().is_empty());
    }

    #[test]
    fn empty_key_stores_at_root() {
        let (_file, mut store) = open_store();
        let root = new_node(&mut store).unwrap();
        let a = store.store_numbers(&[1, 2, 3, 4]).unwrap();
        add(&mut store, root, b"", a).unwrap();
        assert_eq!(search(&store, root, b"").unwrap(), vec![a]);
    }
}
