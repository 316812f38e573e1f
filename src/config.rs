//! Configuration model and precedence.
//!
//! Every setting resolves through the same chain, highest first:
//! invocation override → project config file → environment variable →
//! best-effort build-tool scan (routes directory only) → hard-coded default.
//! A layer that supplies a value wins outright for that setting; layers are
//! never merged beyond this per-setting rule.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pass::PassId;

pub const PROJECT_CONFIG_FILE: &str = "routeshift.config.json";
pub const ENV_ROUTES_DIR: &str = "ROUTESHIFT_ROUTES_DIR";
pub const ENV_APP_DIR: &str = "ROUTESHIFT_APP_DIR";
pub const ENV_DRY_RUN: &str = "ROUTESHIFT_DRY_RUN";

pub const DEFAULT_APP_DIR: &str = "app";
pub const DEFAULT_ROUTES_DIR: &str = "src/routes";

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT CONFIG FILE
// ═══════════════════════════════════════════════════════════════════════════════

/// Shape of `routeshift.config.json`. All keys optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    pub app_directory: Option<String>,
    pub routes_directory: Option<String>,
    /// Allow-list of pass ids; absent means all known passes.
    pub enabled_migrations: Option<Vec<String>>,
    /// Deny-list applied after the allow-list.
    pub disabled_migrations: Option<Vec<String>>,
    /// Per-id boolean overrides applied last; force-adds or force-removes
    /// regardless of the two lists above.
    pub migrations: Option<BTreeMap<String, bool>>,
}

/// Read and parse the project config file. `Ok(None)` means the file is
/// absent; `Err` carries a description for the caller's one-time warning.
pub fn load_project_config(project_dir: &Path) -> Result<Option<ProjectConfig>, String> {
    let path = project_dir.join(PROJECT_CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text =
        fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| format!("{}: {}", path.display(), e))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASS ENABLEMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolve the enabled pass set. Three ordered layers: allow-list, then
/// deny-list, then per-id overrides. Unrecognized ids are ignored at every
/// layer, and the result is normalized to the fixed `PassId::ALL` order.
pub fn resolve_enabled_passes(project: &ProjectConfig) -> Vec<PassId> {
    let mut enabled: Vec<PassId> = match &project.enabled_migrations {
        Some(list) => list.iter().filter_map(|id| PassId::parse(id)).collect(),
        None => PassId::ALL.to_vec(),
    };

    if let Some(deny) = &project.disabled_migrations {
        let denied: Vec<PassId> = deny.iter().filter_map(|id| PassId::parse(id)).collect();
        enabled.retain(|id| !denied.contains(id));
    }

    if let Some(overrides) = &project.migrations {
        for (id, on) in overrides {
            let Some(id) = PassId::parse(id) else { continue };
            if *on && !enabled.contains(&id) {
                enabled.push(id);
            } else if !*on {
                enabled.retain(|p| *p != id);
            }
        }
    }

    PassId::ALL
        .into_iter()
        .filter(|id| enabled.contains(id))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILD-TOOL SCAN
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref ROUTES_DIR_FIELD_RE: Regex =
        Regex::new(r#"routesDirectory\s*:\s*['"]([^'"]+)['"]"#).unwrap();
}

/// Extract a nested `routesDirectory:` assignment from build-config text.
pub fn scan_build_config_text(text: &str) -> Option<String> {
    ROUTES_DIR_FIELD_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Best-effort scan of the project's vite config. `Ok(None)` when no config
/// exists or no field is present; `Err` only on an unreadable file.
pub fn scan_build_config(project_dir: &Path) -> Result<Option<String>, String> {
    for name in ["vite.config.ts", "vite.config.js"] {
        let path = project_dir.join(name);
        if !path.exists() {
            continue;
        }
        return fs::read_to_string(&path)
            .map(|text| scan_build_config_text(&text))
            .map_err(|e| format!("{}: {}", path.display(), e));
    }
    Ok(None)
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVED CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-invocation parameters, e.g. from an orchestrating workflow. Highest
/// layer of the precedence chain; constant for one batch run.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub app_dir: Option<String>,
    pub routes_dir: Option<String>,
}

/// Fully resolved configuration for one project directory. Immutable once
/// built; cached per directory by the batch context.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub project_dir: PathBuf,
    /// Absolute source-convention root (`<project>/<appDirectory>`).
    pub app_dir: PathBuf,
    /// Absolute target-convention root (`<project>/<routesDirectory>`).
    pub routes_dir: PathBuf,
    /// Enabled passes, in fixed merge order.
    pub enabled_passes: Vec<PassId>,
}

impl RuntimeConfig {
    pub fn is_enabled(&self, id: PassId) -> bool {
        self.enabled_passes.contains(&id)
    }
}
