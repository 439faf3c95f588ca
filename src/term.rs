//! Term instance layer: one occurrence of one token in one document, linked
//! to its successor in document order. See spec §4.3.

use crate::token::{stem, Token};
use crate::{Handle, Result, Store, TripeError};

/// A decoded term instance. `raw` is loaded eagerly since both matching
/// modes need it and the record is small.
#[derive(Debug, Clone)]
pub struct TermInstance {
    pub doc_id: u64,
    pub offset: u64,
    pub raw: String,
    pub next: Handle,
}

pub fn create(
    store: &mut Store,
    doc_id: u64,
    offset: u64,
    raw: &str,
    next: Handle,
) -> Result<Handle> {
    let raw_handle = store.store_text(raw)?;
    store.store_numbers(&[doc_id, offset, raw_handle.0, next.0])
}

pub fn load(store: &Store, handle: Handle) -> Result<TermInstance> {
    let nums = store.load_numbers(handle)?;
    if nums.len() != 4 {
        return Err(TripeError::Corrupt(format!(
            "term instance at {} has {} numbers, expected 4",
            handle.0,
            nums.len()
        )));
    }
    let raw = store.load_text(Handle(nums[2]))?;
    Ok(TermInstance {
        doc_id: nums[0],
        offset: nums[1],
        raw,
        next: Handle(nums[3]),
    })
}

pub fn matches_exact(instance: &TermInstance, raw: &str) -> bool {
    instance.raw == raw
}

/// Walks `instance`'s document chain, comparing each subsequent phrase token
/// against the corresponding document term: raw equality in exact mode,
/// stemmed equality otherwise. Fails as soon as the chain runs out before
/// the phrase does.
pub fn matches_phrase(
    store: &Store,
    instance: &TermInstance,
    rest: &[Token],
    exact: bool,
) -> Result<bool> {
    let mut next = instance.next;
    for token in rest {
        if next.is_null() {
            return Ok(false);
        }
        let candidate = load(store, next)?;
        let ok = if exact {
            candidate.raw == token.raw
        } else {
            stem(&candidate.raw) == token.stemmed
        };
        if !ok {
            return Ok(false);
        }
        next = candidate.next;
    }
    Ok(true)
}
