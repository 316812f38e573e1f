//! File relocation transactor.
//!
//! Moves one rewritten file to its derived location without silent data
//! loss: an existing destination with different content is a fatal conflict,
//! an existing destination with equal content means the move already
//! happened. Re-running the pipeline over an unchanged file set is therefore
//! a no-op.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::BatchContext;
use crate::error::MigrationError;

/// One file's move, computed after edit commit and consumed exactly once.
#[derive(Debug, Clone)]
pub struct FileMoveRecord {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub final_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Old and new path are the same file; nothing to do.
    InPlace,
    /// Destination written, source removed.
    Moved,
    /// Destination already held the expected content.
    AlreadyMoved,
    /// Destination written but the environment cannot delete the source.
    SourceRetained,
}

/// Perform the move. `app_root` bounds upward directory pruning and is never
/// removed itself.
pub fn relocate(
    ctx: &BatchContext,
    record: &FileMoveRecord,
    app_root: &Path,
) -> Result<MoveOutcome, MigrationError> {
    if record.old_path == record.new_path {
        return Ok(MoveOutcome::InPlace);
    }

    if record.new_path.exists() {
        let existing = fs::read_to_string(&record.new_path)
            .map_err(|e| MigrationError::io(&record.new_path, e))?;
        if existing != record.final_text {
            return Err(MigrationError::RelocationConflict {
                source_path: record.old_path.clone(),
                destination: record.new_path.clone(),
            });
        }
        // already completed by an earlier run; clean up any leftover source
        if record.old_path.exists() && remove_source(ctx, &record.old_path) {
            prune_empty_dirs(record.old_path.parent(), app_root);
        }
        return Ok(MoveOutcome::AlreadyMoved);
    }

    if let Some(parent) = record.new_path.parent() {
        fs::create_dir_all(parent).map_err(|e| MigrationError::io(parent, e))?;
    }
    fs::write(&record.new_path, &record.final_text)
        .map_err(|e| MigrationError::io(&record.new_path, e))?;

    if !remove_source(ctx, &record.old_path) {
        return Ok(MoveOutcome::SourceRetained);
    }
    prune_empty_dirs(record.old_path.parent(), app_root);
    Ok(MoveOutcome::Moved)
}

/// Delete the source file. Environments without delete support degrade to
/// keeping the original in place, warned once per run.
fn remove_source(ctx: &BatchContext, path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            ctx.warn_once(
                "remove-file-unsupported",
                &format!(
                    "cannot delete source files in this environment ({}), originals left in place",
                    e
                ),
            );
            false
        }
    }
}

/// Walk upward from `start`, removing directories as long as they are empty.
/// Stops at the first non-empty directory, at the app-root boundary (the
/// boundary itself is never removed), or on a failed removal.
fn prune_empty_dirs(start: Option<&Path>, boundary: &Path) {
    let mut current = start;
    while let Some(dir) = current {
        if dir == boundary || !dir.starts_with(boundary) {
            break;
        }
        let empty = match fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => break,
        };
        if !empty {
            break;
        }
        if let Err(e) = fs::remove_dir(dir) {
            debug!(dir = %dir.display(), error = %e, "stopped pruning");
            break;
        }
        current = dir.parent();
    }
}
