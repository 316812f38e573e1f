//! Per-file migration pipeline and the directory batch driver.
//!
//! One file runs end-to-end: resolve config → run passes over the snapshot →
//! commit merged edits → derive the relocation target → cross-check the
//! embedded route declaration → relocate (or write in place for files that
//! keep their location). A dry run stops short of every filesystem write but
//! still returns the rewritten text.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::context::BatchContext;
use crate::error::MigrationError;
use crate::invariant::check_route_declaration;
use crate::matcher::PatternMatcher;
use crate::metrics::MetricLabels;
use crate::orchestrator::run_passes;
use crate::pass::{PassId, PassInput};
use crate::passes::all_passes;
use crate::relocate::{relocate, FileMoveRecord, MoveOutcome};
use crate::routes::{derive_route_target, is_route_filename};
use crate::tree::SyntaxTree;

/// Outcome of one file's migration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: PathBuf,
    /// Whether any pass produced an edit.
    pub edited: bool,
    /// The file's content after the run (the original text when unedited).
    pub final_text: String,
    /// Destination path: performed, or planned when `dry_run` is set.
    pub moved_to: Option<PathBuf>,
    pub dry_run: bool,
    /// Human-readable manual-review flags.
    pub flags: Vec<String>,
    /// Edits each pass contributed before merging, keyed by pass id.
    pub edits_by_pass: BTreeMap<String, usize>,
}

/// Migrate a single file. Fatal errors abort this file only.
pub fn migrate_file(
    ctx: &BatchContext,
    matcher: &dyn PatternMatcher,
    project_dir: &Path,
    file_path: &Path,
) -> Result<FileReport, MigrationError> {
    let config = ctx.runtime_config(project_dir);
    let source = fs::read_to_string(file_path).map_err(|e| MigrationError::io(file_path, e))?;
    let tree = SyntaxTree::scan(&source);

    let passes = all_passes();
    let input = PassInput {
        tree: &tree,
        file_path,
        config: &config,
        matcher,
        metrics: ctx.metrics(),
    };
    let run = run_passes(&passes, &input)?;
    let edited = run.text.is_some();
    let final_text = run.text.unwrap_or_else(|| source.clone());
    let edits_by_pass: BTreeMap<String, usize> = run
        .edits_by_pass
        .into_iter()
        .map(|(pass, count)| (pass.to_string(), count))
        .collect();

    // relocation rides on the route-declaration migration: with it disabled,
    // files keep their locations and only content passes apply
    let relocation_enabled = config.is_enabled(PassId::RouteDeclaration);
    let target = if relocation_enabled {
        derive_route_target(file_path, &config)
    } else {
        None
    };
    let flags: Vec<String> = target
        .as_ref()
        .map(|t| t.flags.iter().map(|f| f.to_string()).collect())
        .unwrap_or_default();

    let moved_to = match target {
        Some(target) => {
            if target.role.requires_declaration() {
                check_route_declaration(&final_text, file_path, &config)?;
            }
            if ctx.is_dry_run() {
                debug!(from = %file_path.display(), to = %target.path.display(), "dry run, move skipped");
                Some(target.path)
            } else {
                let record = FileMoveRecord {
                    old_path: file_path.to_path_buf(),
                    new_path: target.path.clone(),
                    final_text: final_text.clone(),
                };
                match relocate(ctx, &record, &config.app_dir)? {
                    MoveOutcome::InPlace => {
                        // target equals source: no move, but committed edits
                        // must still land
                        if edited {
                            fs::write(file_path, &final_text)
                                .map_err(|e| MigrationError::io(file_path, e))?;
                        }
                        None
                    }
                    _ => Some(target.path),
                }
            }
        }
        None => {
            let is_blocked_route_file = relocation_enabled
                && file_path.starts_with(&config.app_dir)
                && file_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map_or(false, is_route_filename);
            if is_blocked_route_file {
                ctx.metrics().increment(&MetricLabels::blocked(), 1);
            }
            // location stays put, but committed content edits still land
            if edited && !ctx.is_dry_run() {
                fs::write(file_path, &final_text)
                    .map_err(|e| MigrationError::io(file_path, e))?;
            }
            None
        }
    };

    Ok(FileReport {
        path: file_path.to_path_buf(),
        edited,
        final_text,
        moved_to,
        dry_run: ctx.is_dry_run(),
        flags,
        edits_by_pass,
    })
}

const SOURCE_EXTENSIONS: [&str; 4] = ["ts", "tsx", "js", "jsx"];

/// Migrate every source file under the project's app directory. One file's
/// failure is reported and skipped; the batch continues.
pub fn migrate_directory(
    ctx: &BatchContext,
    matcher: &dyn PatternMatcher,
    project_dir: &Path,
) -> Vec<(PathBuf, Result<FileReport, MigrationError>)> {
    let config = ctx.runtime_config(project_dir);
    if !config.app_dir.exists() {
        warn!(dir = %config.app_dir.display(), "app directory does not exist, nothing to migrate");
        return Vec::new();
    }

    // collect before processing: relocation mutates the tree being walked
    let files: Vec<PathBuf> = walkdir::WalkDir::new(&config.app_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext))
        })
        .map(|entry| entry.into_path())
        .collect();

    files
        .into_iter()
        .map(|file| {
            let result = migrate_file(ctx, matcher, project_dir, &file);
            if let Err(e) = &result {
                warn!(file = %file.display(), error = %e, "file migration aborted");
            }
            (file, result)
        })
        .collect()
}
