//! Graphviz rendering of the trie and term chains, for the `dot` CLI command.
//! Structurally the same traversal as the original `tripe_dot.py`: a
//! breadth-first walk of trie nodes carrying the accumulated key prefix,
//! with match nodes rendered as boxes and `next` pointers as dashed edges.

use crate::{trie, Handle, Result, Store};
use std::collections::VecDeque;
use std::fmt::Write as _;

pub fn render(store: &Store, root: Handle) -> Result<String> {
    let mut out = String::from("digraph Tripe {\n");
    let mut queue = VecDeque::new();
    queue.push_back((root, String::new()));

    while let Some((node, prefix)) = queue.pop_front() {
        let _ = writeln!(out, "  N{}[label=\"{}\"]", node.raw(), escape(&prefix));

        for (byte, child) in trie::children(store, node)? {
            let _ = writeln!(
                out,
                "  N{} -> N{} [label=\"{}\"]",
                node.raw(),
                child.raw(),
                escape(&(byte as char).to_string())
            );
            let mut child_prefix = prefix.clone();
            child_prefix.push(byte as char);
            queue.push_back((child, child_prefix));
        }

        for match_handle in trie::matches(store, node)? {
            let _ = writeln!(out, "  N{} -> M{}", node.raw(), match_handle.raw());
            let instance = crate::term::load(store, match_handle)?;
            let _ = writeln!(
                out,
                "  M{} [label=\"{}\" shape=box]",
                match_handle.raw(),
                escape(&instance.raw)
            );
            if !instance.next.is_null() {
                let _ = writeln!(
                    out,
                    "  M{} -> M{} [style=dashed]",
                    match_handle.raw(),
                    instance.next.raw()
                );
            }
        }
    }

    out.push_str("}\n");
    Ok(out)
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
