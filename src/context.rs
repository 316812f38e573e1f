//! Per-run batch context.
//!
//! One `BatchContext` is constructed per batch run and threaded through every
//! call that needs shared state: the per-directory config caches, the
//! captured environment, one-time warning flags, the dry-run switch, and the
//! metrics sink. Nothing in the crate reaches for process globals.
//!
//! The caches are compute-once-read-many. Concurrent misses for one key may
//! recompute redundantly but always converge to the same value, so resolution
//! deliberately runs outside the lock.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::{
    self, ConfigOverrides, RuntimeConfig, DEFAULT_APP_DIR, DEFAULT_ROUTES_DIR, ENV_APP_DIR,
    ENV_DRY_RUN, ENV_ROUTES_DIR,
};
use crate::metrics::{MetricsSink, NoopMetrics};

pub struct BatchContext {
    metrics: Arc<dyn MetricsSink>,
    dry_run: bool,
    overrides: ConfigOverrides,
    env: HashMap<String, String>,
    config_cache: Mutex<HashMap<PathBuf, Arc<RuntimeConfig>>>,
    scan_cache: Mutex<HashMap<PathBuf, Option<String>>>,
    warned: Mutex<HashSet<String>>,
}

impl BatchContext {
    /// Context capturing the process environment at construction time.
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self::with_env(overrides, std::env::vars().collect(), Arc::new(NoopMetrics))
    }

    /// Context with an explicit environment snapshot and metrics sink.
    pub fn with_env(
        overrides: ConfigOverrides,
        env: HashMap<String, String>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let dry_run = env
            .get(ENV_DRY_RUN)
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        BatchContext {
            metrics,
            dry_run,
            overrides,
            env,
            config_cache: Mutex::new(HashMap::new()),
            scan_cache: Mutex::new(HashMap::new()),
            warned: Mutex::new(HashSet::new()),
        }
    }

    pub fn dry_run(mut self, value: bool) -> Self {
        self.dry_run = value;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Emit a warning at most once per run for the given key. Returns whether
    /// this call was the one that warned.
    pub(crate) fn warn_once(&self, key: &str, message: &str) -> bool {
        let mut warned = self.warned.lock().expect("warn set poisoned");
        if warned.insert(key.to_string()) {
            warn!("{}", message);
            true
        } else {
            false
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIG RESOLUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Resolved config for a project directory, cached after first use.
    pub fn runtime_config(&self, project_dir: &Path) -> Arc<RuntimeConfig> {
        if let Some(hit) = self
            .config_cache
            .lock()
            .expect("config cache poisoned")
            .get(project_dir)
        {
            return Arc::clone(hit);
        }

        let resolved = Arc::new(self.resolve_config(project_dir));
        self.config_cache
            .lock()
            .expect("config cache poisoned")
            .entry(project_dir.to_path_buf())
            .or_insert(resolved)
            .clone()
    }

    fn resolve_config(&self, project_dir: &Path) -> RuntimeConfig {
        let project = match config::load_project_config(project_dir) {
            Ok(Some(cfg)) => cfg,
            Ok(None) => {
                debug!(dir = %project_dir.display(), "no project config file, using defaults");
                Default::default()
            }
            Err(message) => {
                self.warn_once(
                    "project-config-parse",
                    &format!("project config unusable, falling back to defaults: {}", message),
                );
                Default::default()
            }
        };

        let app_dir = self
            .overrides
            .app_dir
            .clone()
            .or_else(|| project.app_directory.clone())
            .or_else(|| self.env(ENV_APP_DIR).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_APP_DIR.to_string());

        let routes_dir = self
            .overrides
            .routes_dir
            .clone()
            .or_else(|| project.routes_directory.clone())
            .or_else(|| self.env(ENV_ROUTES_DIR).map(str::to_string))
            .or_else(|| self.scanned_routes_dir(project_dir))
            .unwrap_or_else(|| DEFAULT_ROUTES_DIR.to_string());

        RuntimeConfig {
            project_dir: project_dir.to_path_buf(),
            app_dir: project_dir.join(app_dir),
            routes_dir: project_dir.join(routes_dir),
            enabled_passes: config::resolve_enabled_passes(&project),
        }
    }

    /// Routes directory scanned out of the build-tool config, cached per
    /// directory. Failures are advisory: warn once, resolve to `None`.
    pub(crate) fn scanned_routes_dir(&self, project_dir: &Path) -> Option<String> {
        if let Some(hit) = self
            .scan_cache
            .lock()
            .expect("scan cache poisoned")
            .get(project_dir)
        {
            return hit.clone();
        }

        let scanned = match config::scan_build_config(project_dir) {
            Ok(value) => value,
            Err(message) => {
                self.warn_once(
                    "build-config-scan",
                    &format!("build config scan failed, ignoring it: {}", message),
                );
                None
            }
        };
        self.scan_cache
            .lock()
            .expect("scan cache poisoned")
            .entry(project_dir.to_path_buf())
            .or_insert(scanned)
            .clone()
    }
}
