//! Index facade: owns the root trie node handle and exposes `add`/`search`.
//! See spec §4.4.

use crate::token::tokenize;
use crate::{term, trie, Handle, Result, Store, TripeError};

/// One matched occurrence, returned by `Index::search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub doc_id: u64,
    pub offset: u64,
    pub raw: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Index {
    root: Handle,
}

impl Index {
    /// Adopts `store`'s existing root trie node, creating one (and writing
    /// it to the header) if this is a fresh store.
    pub fn open(store: &mut Store) -> Result<Index> {
        let root = store.get_root()?;
        let root = if root.is_null() {
            let root = trie::new_node(store)?;
            store.set_root(root)?;
            root
        } else {
            root
        };
        Ok(Index { root })
    }

    pub fn root(&self) -> Handle {
        self.root
    }

    /// Tokenizes `text`, then processes tokens in reverse order so that each
    /// term instance's `next` handle can be filled in at creation time (spec
    /// §4.4 `add`).
    pub fn add(&self, store: &mut Store, text: &str, doc_id: u64) -> Result<()> {
        let tokens = tokenize(text);
        tracing::debug!(doc_id, tokens = tokens.len(), "adding document");
        let mut next = Handle::NULL;
        for token in tokens.iter().rev() {
            let instance = term::create(store, doc_id, token.offset as u64, &token.raw, next)?;
            trie::add(store, self.root, token.stemmed.as_bytes(), instance)?;
            next = instance;
        }
        Ok(())
    }

    /// Tokenizes `phrase`, finds candidates for its first stemmed token in
    /// the trie, then filters by raw-token equality (if `exact`) and by the
    /// remaining tokens matching the document chain.
    pub fn search(&self, store: &Store, phrase: &str, exact: bool) -> Result<Vec<SearchResult>> {
        let tokens = tokenize(phrase);
        let (first, rest) = tokens.split_first().ok_or(TripeError::EmptyPhrase)?;

        let candidates = trie::search(store, self.root, first.stemmed.as_bytes())?;
        tracing::debug!(
            phrase,
            exact,
            candidates = candidates.len(),
            "searching phrase"
        );

        let mut results = Vec::new();
        for handle in candidates {
            let instance = term::load(store, handle)?;
            if exact && !term::matches_exact(&instance, &first.raw) {
                continue;
            }
            if term::matches_phrase(store, &instance, rest, exact)? {
                results.push(SearchResult {
                    doc_id: instance.doc_id,
                    offset: instance.offset,
                    raw: instance.raw,
                });
            }
        }
        tracing::debug!(matches = results.len(), "search complete");
        Ok(results)
    }
}
