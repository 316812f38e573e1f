//! # routeshift
//!
//! Deterministic, multi-pass source-to-source migration from Next.js
//! app-directory routing to file-route conventions.
//!
//! ## Pipeline invariants
//!
//! 1. **Immutable snapshot**: every enabled pass reads the same per-file
//!    `SyntaxTree`; passes never observe each other's edits.
//! 2. **Deterministic merge**: edits merge in the fixed `PassId` order with
//!    explicit last-write-wins on a shared target node.
//! 3. **Abort before write**: a failing pass, a route-declaration mismatch,
//!    or a relocation conflict aborts that file with zero filesystem changes.
//! 4. **Idempotence**: re-running the pipeline over an already-migrated tree
//!    produces no edits and no moves.
//! 5. **No hidden globals**: caches, warn-once flags, environment, and the
//!    metrics sink live in a `BatchContext` built once per run and threaded
//!    through every call.

mod config;
mod context;
mod edit;
mod error;
mod invariant;
mod matcher;
mod metrics;
mod orchestrator;
mod pass;
mod passes;
mod pipeline;
mod relocate;
mod routes;
mod tree;


pub use config::{
    load_project_config, resolve_enabled_passes, scan_build_config, scan_build_config_text,
    ConfigOverrides, ProjectConfig, RuntimeConfig, DEFAULT_APP_DIR, DEFAULT_ROUTES_DIR,
    ENV_APP_DIR, ENV_DRY_RUN, ENV_ROUTES_DIR, PROJECT_CONFIG_FILE,
};
pub use context::BatchContext;
pub use edit::{commit_edits, merge_edits, Edit};
pub use error::MigrationError;
pub use invariant::check_route_declaration;
pub use matcher::{MatchHit, MatchQuery, PatternMatcher, TextMatcher};
pub use metrics::{Bucket, CountingMetrics, Effort, MetricLabels, MetricsSink, NoopMetrics};
pub use orchestrator::{run_passes, PassRun};
pub use pass::{PassId, PassInput, PassOutcome, TransformPass};
pub use passes::{all_passes, ROUTER_PACKAGE};
pub use pipeline::{migrate_directory, migrate_file, FileReport};
pub use relocate::{relocate, FileMoveRecord, MoveOutcome};
pub use routes::{
    derive_route_target, derive_route_token, is_route_filename, ManualFlag, RouteRole,
    RouteTarget, RouteToken, CATCH_ALL,
};
pub use tree::{kind, NodeId, NodeKey, Span, SyntaxTree};
