//! Transform-pass contract.
//!
//! A pass is a pure read of one file's tree snapshot that yields node-scoped
//! edits. Passes never see each other's output; the orchestrator merges edit
//! lists afterwards in the fixed `PassId` order below.

use std::path::Path;

use crate::config::RuntimeConfig;
use crate::edit::Edit;
use crate::error::MigrationError;
use crate::matcher::PatternMatcher;
use crate::metrics::MetricsSink;
use crate::tree::SyntaxTree;

/// Known pass identifiers, in merge order. The declaration order here is the
/// deterministic order edits are merged in; config layers can only select a
/// subset, never reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    RouteDeclaration,
    LinkComponent,
    ImageComponent,
    NavigationHooks,
}

impl PassId {
    pub const ALL: [PassId; 4] = [
        PassId::RouteDeclaration,
        PassId::LinkComponent,
        PassId::ImageComponent,
        PassId::NavigationHooks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PassId::RouteDeclaration => "route-declaration",
            PassId::LinkComponent => "link-component",
            PassId::ImageComponent => "image-component",
            PassId::NavigationHooks => "navigation-hooks",
        }
    }

    /// Unrecognized ids resolve to `None` and are ignored by config layers.
    pub fn parse(id: &str) -> Option<PassId> {
        PassId::ALL.iter().copied().find(|p| p.as_str() == id)
    }
}

impl std::fmt::Display for PassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a pass may read. The tree snapshot is shared by all passes of
/// one file; nothing here is mutable.
pub struct PassInput<'a> {
    pub tree: &'a SyntaxTree,
    pub file_path: &'a Path,
    pub config: &'a RuntimeConfig,
    pub matcher: &'a dyn PatternMatcher,
    pub metrics: &'a dyn MetricsSink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Edited(Vec<Edit>),
    Unchanged,
}

impl PassOutcome {
    pub fn into_edits(self) -> Vec<Edit> {
        match self {
            PassOutcome::Edited(edits) => edits,
            PassOutcome::Unchanged => Vec::new(),
        }
    }

    /// Collapse an empty edit list to `Unchanged`.
    pub fn from_edits(edits: Vec<Edit>) -> PassOutcome {
        if edits.is_empty() {
            PassOutcome::Unchanged
        } else {
            PassOutcome::Edited(edits)
        }
    }
}

pub trait TransformPass: Send + Sync {
    fn id(&self) -> PassId;

    fn run(&self, input: &PassInput<'_>) -> Result<PassOutcome, MigrationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_ids_round_trip() {
        for id in PassId::ALL {
            assert_eq!(PassId::parse(id.as_str()), Some(id));
        }
        assert_eq!(PassId::parse("unknown-pass"), None);
    }

    #[test]
    fn empty_edit_list_collapses_to_unchanged() {
        assert_eq!(PassOutcome::from_edits(Vec::new()), PassOutcome::Unchanged);
    }
}
