use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for one file's migration.
///
/// Correctness-critical variants (`RouteMismatch`, `RootFormRequired`,
/// `RelocationConflict`, `PassFailed`) are always fatal for the file being
/// processed. Config and capability problems are handled where they occur and
/// never surface through this type.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("pass `{pass}` failed on {}: {message}", file.display())]
    PassFailed {
        pass: &'static str,
        file: PathBuf,
        message: String,
    },

    #[error(
        "route declaration mismatch in {}: rewritten text declares `{declared}` \
         but the path derives to `{derived}`", file.display()
    )]
    RouteMismatch {
        file: PathBuf,
        declared: String,
        derived: String,
    },

    #[error(
        "{} maps to the root route and must use createRootRoute() with no \
         path argument, found `{declared}`", file.display()
    )]
    RootFormRequired { file: PathBuf, declared: String },

    #[error("rewritten {} carries no route declaration to validate", file.display())]
    MissingDeclaration { file: PathBuf },

    // the field cannot be called `source`: thiserror reserves that name for
    // the error cause, which a path is not
    #[error(
        "relocation conflict: {} already exists with different content \
         (source {} left untouched)", destination.display(), source_path.display()
    )]
    RelocationConflict {
        source_path: PathBuf,
        destination: PathBuf,
    },

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MigrationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrationError::Io {
            path: path.into(),
            source,
        }
    }
}
