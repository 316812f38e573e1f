//! Edit model: span-keyed text replacements and the deterministic merge that
//! commits them.
//!
//! An edit replaces one node's literal text. Edits are keyed by the node's
//! span, so merging and application never depend on object identity or on
//! the order text offsets shift during splicing.

use std::collections::BTreeMap;

use tracing::debug;

use crate::tree::{NodeKey, SyntaxTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub target: NodeKey,
    pub replacement: String,
}

impl Edit {
    pub fn new(target: NodeKey, replacement: impl Into<String>) -> Self {
        Edit {
            target,
            replacement: replacement.into(),
        }
    }
}

/// Merge per-pass edit lists in the given (fixed) pass order.
///
/// Duplicate-target policy is explicit last-write-wins: when two passes edit
/// the same node, the pass later in the order overwrites the earlier one.
pub fn merge_edits(per_pass: Vec<(&'static str, Vec<Edit>)>) -> Vec<Edit> {
    let mut merged: BTreeMap<NodeKey, Edit> = BTreeMap::new();
    for (pass, edits) in per_pass {
        for edit in edits {
            if merged.insert(edit.target, edit.clone()).is_some() {
                debug!(
                    pass,
                    span_start = edit.target.start,
                    span_end = edit.target.end,
                    "duplicate edit target, later pass wins"
                );
            }
        }
    }
    merged.into_values().collect()
}

/// Apply merged edits to the tree's source and return the final text.
///
/// Edits are applied highest span first so earlier replacements never
/// invalidate the offsets of later ones. An edit nested inside an
/// already-applied edit is dropped: the outer replacement subsumed it.
pub fn commit_edits(tree: &SyntaxTree, edits: &[Edit]) -> String {
    let mut ordered: Vec<&Edit> = edits
        .iter()
        .filter(|edit| {
            // zero-width targets are insertions at a boundary, never nested
            let nested = !edit.target.is_empty()
                && edits.iter().any(|outer| {
                    outer.target != edit.target
                        && outer.target.start <= edit.target.start
                        && edit.target.end <= outer.target.end
                });
            if nested {
                debug!(
                    span_start = edit.target.start,
                    span_end = edit.target.end,
                    "edit nested inside another replacement, dropped"
                );
            }
            !nested
        })
        .collect();
    ordered.sort_by(|a, b| b.target.cmp(&a.target));

    let mut text = tree.source().to_string();
    let mut applied_floor = usize::MAX;
    for edit in ordered {
        if edit.target.end > applied_floor {
            continue;
        }
        text.replace_range(edit.target.start..edit.target.end, &edit.replacement);
        applied_floor = edit.target.start;
    }
    text
}
