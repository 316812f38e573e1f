//! Route-declaration invariant check.
//!
//! After text commit and before any filesystem write, the expected route
//! token is recomputed from the *original* path (segment rules only, ignoring
//! the filename-role mapping) and compared against the literal path argument
//! embedded in the rewritten text. A mismatch here means a transform-order
//! bug that would register the route under the wrong path, so it is always
//! fatal.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::RuntimeConfig;
use crate::error::MigrationError;
use crate::routes::{derive_route_token, RouteToken};

lazy_static! {
    static ref FILE_ROUTE_RE: Regex =
        Regex::new(r#"createFileRoute\(\s*['"]([^'"]*)['"]\s*\)"#).unwrap();
    static ref ROOT_ROUTE_RE: Regex = Regex::new(r"createRootRoute\s*\(").unwrap();
}

/// Validate the rewritten text of a declaration-bearing file against the
/// token derived from its original path.
pub fn check_route_declaration(
    final_text: &str,
    original_path: &Path,
    config: &RuntimeConfig,
) -> Result<(), MigrationError> {
    let expected = match derive_route_token(original_path, config) {
        Some(token) => token,
        // not eligible: nothing was relocated, nothing to cross-check
        None => return Ok(()),
    };

    let declared = FILE_ROUTE_RE
        .captures(final_text)
        .map(|caps| caps[1].to_string());

    match expected {
        RouteToken::Root => {
            // the root declaration form takes no path argument
            if let Some(declared) = declared {
                return Err(MigrationError::RootFormRequired {
                    file: original_path.to_path_buf(),
                    declared,
                });
            }
            if !ROOT_ROUTE_RE.is_match(final_text) {
                return Err(MigrationError::MissingDeclaration {
                    file: original_path.to_path_buf(),
                });
            }
        }
        RouteToken::Path(expected) => match declared {
            Some(declared) if declared == expected => {}
            Some(declared) => {
                return Err(MigrationError::RouteMismatch {
                    file: original_path.to_path_buf(),
                    declared,
                    derived: expected,
                });
            }
            None => {
                return Err(MigrationError::MissingDeclaration {
                    file: original_path.to_path_buf(),
                });
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::PassId;
    use std::path::PathBuf;

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            project_dir: PathBuf::from("/proj"),
            app_dir: PathBuf::from("/proj/app"),
            routes_dir: PathBuf::from("/proj/src/routes"),
            enabled_passes: PassId::ALL.to_vec(),
        }
    }

    #[test]
    fn matching_token_passes() {
        let text = "export const Route = createFileRoute('/blog/$id')({ component: Page })";
        check_route_declaration(text, Path::new("/proj/app/blog/[id]/page.tsx"), &config())
            .unwrap();
    }

    #[test]
    fn mismatched_token_is_fatal_and_names_both_paths() {
        let text = "export const Route = createFileRoute('/blog')({ component: Page })";
        let err = check_route_declaration(
            text,
            Path::new("/proj/app/blog/[id]/page.tsx"),
            &config(),
        )
        .unwrap_err();
        match err {
            MigrationError::RouteMismatch { declared, derived, .. } => {
                assert_eq!(declared, "/blog");
                assert_eq!(derived, "/blog/$id");
            }
            other => panic!("expected RouteMismatch, got {:?}", other),
        }
    }

    #[test]
    fn root_layout_must_use_root_form() {
        let good = "export const Route = createRootRoute({ component: RootLayout })";
        check_route_declaration(good, Path::new("/proj/app/layout.tsx"), &config()).unwrap();

        let bad = "export const Route = createFileRoute('/')({ component: RootLayout })";
        let err = check_route_declaration(bad, Path::new("/proj/app/layout.tsx"), &config())
            .unwrap_err();
        assert!(matches!(err, MigrationError::RootFormRequired { .. }));
    }

    #[test]
    fn missing_declaration_is_fatal() {
        let err = check_route_declaration(
            "const nothing = true",
            Path::new("/proj/app/page.tsx"),
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::MissingDeclaration { .. }));
    }

    #[test]
    fn ineligible_paths_are_not_checked() {
        check_route_declaration(
            "const nothing = true",
            Path::new("/proj/app/@modal/page.tsx"),
            &config(),
        )
        .unwrap();
    }
}
