//! Pass orchestration.
//!
//! All enabled passes run against the same immutable tree snapshot, in
//! parallel; the deterministic merge afterwards is the only serialization
//! point. Any pass failure aborts the whole file before anything is
//! committed.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use crate::edit::{commit_edits, merge_edits, Edit};
use crate::error::MigrationError;
use crate::pass::{PassInput, PassOutcome, TransformPass};

/// Result of one file's pass run.
#[derive(Debug)]
pub struct PassRun {
    /// Committed text, or `None` when no pass produced an edit.
    pub text: Option<String>,
    /// Edit count per pass that produced any, keyed by pass id.
    pub edits_by_pass: BTreeMap<&'static str, usize>,
}

/// Run every enabled pass and commit the merged edits.
pub fn run_passes(
    passes: &[Box<dyn TransformPass>],
    input: &PassInput<'_>,
) -> Result<PassRun, MigrationError> {
    let enabled: Vec<&Box<dyn TransformPass>> = passes
        .iter()
        .filter(|pass| input.config.is_enabled(pass.id()))
        .collect();

    // Pure reads of one snapshot; order of execution is irrelevant, order of
    // merging below is not.
    let results: Vec<Result<(&'static str, PassOutcome), MigrationError>> = enabled
        .par_iter()
        .map(|pass| pass.run(input).map(|outcome| (pass.id().as_str(), outcome)))
        .collect();

    let mut per_pass: Vec<(&'static str, Vec<Edit>)> = Vec::with_capacity(results.len());
    let mut edits_by_pass = BTreeMap::new();
    for result in results {
        let (pass, outcome) = result?;
        match outcome {
            PassOutcome::Edited(edits) => {
                edits_by_pass.insert(pass, edits.len());
                per_pass.push((pass, edits));
            }
            PassOutcome::Unchanged => debug!(pass, "no applicable change"),
        }
    }

    let merged = merge_edits(per_pass);
    let text = if merged.is_empty() {
        None
    } else {
        Some(commit_edits(input.tree, &merged))
    };
    Ok(PassRun {
        text,
        edits_by_pass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::edit::Edit;
    use crate::matcher::TextMatcher;
    use crate::metrics::NoopMetrics;
    use crate::pass::PassId;
    use crate::tree::SyntaxTree;
    use std::path::{Path, PathBuf};

    struct StubPass {
        id: PassId,
        behavior: Behavior,
    }

    enum Behavior {
        EditFirstStatement(&'static str),
        Fail,
        Unchanged,
    }

    impl TransformPass for StubPass {
        fn id(&self) -> PassId {
            self.id
        }

        fn run(&self, input: &PassInput<'_>) -> Result<PassOutcome, MigrationError> {
            match self.behavior {
                Behavior::EditFirstStatement(replacement) => {
                    let node = input.tree.statements().next().unwrap();
                    Ok(PassOutcome::Edited(vec![Edit::new(
                        input.tree.span(node),
                        replacement,
                    )]))
                }
                Behavior::Fail => Err(MigrationError::PassFailed {
                    pass: self.id.as_str(),
                    file: input.file_path.to_path_buf(),
                    message: "stub failure".to_string(),
                }),
                Behavior::Unchanged => Ok(PassOutcome::Unchanged),
            }
        }
    }

    fn config_with(enabled: Vec<PassId>) -> RuntimeConfig {
        RuntimeConfig {
            project_dir: PathBuf::from("/proj"),
            app_dir: PathBuf::from("/proj/app"),
            routes_dir: PathBuf::from("/proj/src/routes"),
            enabled_passes: enabled,
        }
    }

    fn run(
        passes: Vec<Box<dyn TransformPass>>,
        enabled: Vec<PassId>,
        source: &str,
    ) -> Result<PassRun, MigrationError> {
        let tree = SyntaxTree::scan(source);
        let config = config_with(enabled);
        let input = PassInput {
            tree: &tree,
            file_path: Path::new("/proj/app/page.tsx"),
            config: &config,
            matcher: &TextMatcher,
            metrics: &NoopMetrics,
        };
        run_passes(&passes, &input)
    }

    #[test]
    fn later_pass_in_fixed_order_wins_shared_target() {
        let passes: Vec<Box<dyn TransformPass>> = vec![
            Box::new(StubPass {
                id: PassId::RouteDeclaration,
                behavior: Behavior::EditFirstStatement("from-earlier"),
            }),
            Box::new(StubPass {
                id: PassId::LinkComponent,
                behavior: Behavior::EditFirstStatement("from-later"),
            }),
        ];
        let out = run(passes, PassId::ALL.to_vec(), "const x = 1\n").unwrap();
        let text = out.text.unwrap();
        assert!(text.contains("from-later"));
        assert!(!text.contains("from-earlier"));
        // both passes still report their (pre-merge) edit
        assert_eq!(out.edits_by_pass.get("route-declaration"), Some(&1));
        assert_eq!(out.edits_by_pass.get("link-component"), Some(&1));
    }

    #[test]
    fn failing_pass_aborts_the_file_with_no_text() {
        let passes: Vec<Box<dyn TransformPass>> = vec![
            Box::new(StubPass {
                id: PassId::RouteDeclaration,
                behavior: Behavior::EditFirstStatement("should never land"),
            }),
            Box::new(StubPass {
                id: PassId::LinkComponent,
                behavior: Behavior::Fail,
            }),
        ];
        let err = run(passes, PassId::ALL.to_vec(), "const x = 1\n").unwrap_err();
        assert!(matches!(err, MigrationError::PassFailed { .. }));
    }

    #[test]
    fn disabled_passes_never_run() {
        let passes: Vec<Box<dyn TransformPass>> = vec![Box::new(StubPass {
            id: PassId::ImageComponent,
            behavior: Behavior::Fail,
        })];
        let out = run(passes, vec![PassId::LinkComponent], "const x = 1\n").unwrap();
        assert_eq!(out.text, None);
        assert!(out.edits_by_pass.is_empty());
    }

    #[test]
    fn all_unchanged_yields_no_text() {
        let passes: Vec<Box<dyn TransformPass>> = vec![Box::new(StubPass {
            id: PassId::LinkComponent,
            behavior: Behavior::Unchanged,
        })];
        let out = run(passes, PassId::ALL.to_vec(), "const x = 1\n").unwrap();
        assert_eq!(out.text, None);
    }
}
