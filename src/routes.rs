//! Route path derivation.
//!
//! Pure mapping from a file's location under the Next.js app directory to its
//! location under the file-route directory, plus the route token the file's
//! rewritten declaration must carry. No filesystem access happens here.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::RuntimeConfig;

// ═══════════════════════════════════════════════════════════════════════════════
// TARGET TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// What the file is, in the source convention's terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteRole {
    Page,
    RootLayout,
    NestedLayout,
    PendingBoundary,
    ErrorBoundary,
    NotFoundBoundary,
    Template,
    ApiHandler,
}

impl RouteRole {
    /// Roles whose rewritten text must carry a route declaration.
    pub fn requires_declaration(&self) -> bool {
        matches!(
            self,
            RouteRole::Page | RouteRole::RootLayout | RouteRole::NestedLayout
        )
    }
}

/// The literal path argument the rewritten declaration must use. The root
/// layout uses the distinct root form, which takes no path argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteToken {
    Root,
    Path(String),
}

/// Something the engine rewrote (or relocated) but cannot guarantee is
/// semantically equivalent; surfaced in the file report for human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum ManualFlag {
    /// `[[...name]]` collapses to the same catch-all token as `[...name]`;
    /// the optional-match semantics may not transfer.
    OptionalCatchAll(String),
    /// Template files have no structural equivalent in the target convention.
    TemplateFile,
}

impl std::fmt::Display for ManualFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManualFlag::OptionalCatchAll(seg) => write!(
                f,
                "optional catch-all `{}` mapped to a required catch-all, review match semantics",
                seg
            ),
            ManualFlag::TemplateFile => {
                write!(f, "template file has no file-route equivalent, migrate by hand")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteTarget {
    pub path: PathBuf,
    pub token: RouteToken,
    pub role: RouteRole,
    pub flags: Vec<ManualFlag>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEGMENT MAPPING
// ═══════════════════════════════════════════════════════════════════════════════

/// The catch-all token in the target convention. Both catch-all spellings
/// collapse to it.
pub const CATCH_ALL: &str = "$";

fn is_route_group(segment: &str) -> bool {
    segment.starts_with('(') && segment.ends_with(')') && segment.len() > 2
}

fn map_segment(segment: &str) -> (String, Option<ManualFlag>) {
    if is_route_group(segment) {
        return (format!("_{}", &segment[1..segment.len() - 1]), None);
    }
    if segment.starts_with("[[...") && segment.ends_with("]]") {
        return (
            CATCH_ALL.to_string(),
            Some(ManualFlag::OptionalCatchAll(segment.to_string())),
        );
    }
    if segment.strip_prefix("[...").and_then(|s| s.strip_suffix(']')).is_some() {
        return (CATCH_ALL.to_string(), None);
    }
    if let Some(inner) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return (format!("${}", inner), None);
    }
    (segment.to_string(), None)
}

/// Filename stems that mark a file as route-bearing in the source convention.
pub fn is_route_filename(stem: &str) -> bool {
    matches!(
        stem,
        "page" | "layout" | "loading" | "error" | "not-found" | "template" | "route"
    )
}

fn role_for(stem: &str, at_app_root: bool) -> Option<RouteRole> {
    Some(match stem {
        "page" => RouteRole::Page,
        "layout" if at_app_root => RouteRole::RootLayout,
        "layout" => RouteRole::NestedLayout,
        "loading" => RouteRole::PendingBoundary,
        "error" => RouteRole::ErrorBoundary,
        "not-found" => RouteRole::NotFoundBoundary,
        "template" => RouteRole::Template,
        "route" => RouteRole::ApiHandler,
        _ => return None,
    })
}

fn target_stem(role: RouteRole) -> &'static str {
    match role {
        RouteRole::Page => "index",
        RouteRole::RootLayout => "__root",
        RouteRole::NestedLayout => "route",
        RouteRole::PendingBoundary => "pending",
        RouteRole::ErrorBoundary => "error",
        RouteRole::NotFoundBoundary => "not-found",
        RouteRole::Template => "template",
        RouteRole::ApiHandler => "route",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELIGIBILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Directory segments (between app root and filename) for a file under the
/// configured app directory, or `None` when the file lives elsewhere.
fn app_relative<'a>(path: &'a Path, config: &RuntimeConfig) -> Option<&'a Path> {
    path.strip_prefix(&config.app_dir).ok()
}

/// True when the file must never be relocated. Evaluated before any mapping;
/// content passes may still edit an excluded file.
fn is_excluded(segments: &[&str], stem: &str) -> bool {
    for segment in segments {
        // private folders and parallel routes have no 1:1 target location
        if segment.starts_with('_') || segment.starts_with('@') {
            return true;
        }
    }
    if matches!(stem, "layout" | "template") {
        let has_group = segments.iter().any(|s| is_route_group(s));
        let all_groups = segments.iter().all(|s| is_route_group(s));
        if has_group && !all_groups {
            return true;
        }
    }
    false
}

// ═══════════════════════════════════════════════════════════════════════════════
// DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derive the relocation target for `path`, or `None` when the file is not
/// eligible (not under the app dir, not a route filename, or excluded).
pub fn derive_route_target(path: &Path, config: &RuntimeConfig) -> Option<RouteTarget> {
    let relative = app_relative(path, config)?;
    let stem = relative.file_stem()?.to_str()?;
    let extension = relative.extension().and_then(|e| e.to_str()).unwrap_or("tsx");
    if !is_route_filename(stem) {
        return None;
    }

    let segments: Vec<&str> = relative
        .parent()
        .map(|p| p.iter().filter_map(|s| s.to_str()).collect())
        .unwrap_or_default();

    if is_excluded(&segments, stem) {
        return None;
    }

    let at_app_root = segments.is_empty();
    let role = role_for(stem, at_app_root)?;

    let mut flags = Vec::new();
    let mut mapped = Vec::with_capacity(segments.len());
    for segment in &segments {
        let (new_segment, flag) = map_segment(segment);
        if let Some(flag) = flag {
            flags.push(flag);
        }
        mapped.push(new_segment);
    }
    if role == RouteRole::Template {
        flags.push(ManualFlag::TemplateFile);
    }

    let mut target = config.routes_dir.clone();
    for segment in &mapped {
        target.push(segment);
    }
    let filename = match role {
        // API handlers keep their own filename, relocation only
        RouteRole::ApiHandler => relative
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)?,
        _ => format!("{}.{}", target_stem(role), extension),
    };
    target.push(filename);

    let token = if role == RouteRole::RootLayout {
        RouteToken::Root
    } else {
        RouteToken::Path(route_path_of(&mapped))
    };

    Some(RouteTarget {
        path: target,
        token,
        role,
        flags,
    })
}

/// Recompute only the route token from the original path, applying the
/// segment rules and ignoring the filename-role mapping. Used by the
/// invariant checker as an independent second derivation.
pub fn derive_route_token(path: &Path, config: &RuntimeConfig) -> Option<RouteToken> {
    let relative = app_relative(path, config)?;
    let stem = relative.file_stem()?.to_str()?;
    if !is_route_filename(stem) {
        return None;
    }
    let segments: Vec<&str> = relative
        .parent()
        .map(|p| p.iter().filter_map(|s| s.to_str()).collect())
        .unwrap_or_default();
    if is_excluded(&segments, stem) {
        return None;
    }
    if stem == "layout" && segments.is_empty() {
        return Some(RouteToken::Root);
    }
    let mapped: Vec<String> = segments.iter().map(|s| map_segment(s).0).collect();
    Some(RouteToken::Path(route_path_of(&mapped)))
}

fn route_path_of(mapped: &[String]) -> String {
    if mapped.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", mapped.join("/"))
    }
}
