//! Concrete rewrite passes.
//!
//! Each pass reads the shared tree snapshot through the pattern-matcher
//! boundary and yields node-scoped edits. Context-sensitive idioms are
//! counted into the `manual` metrics bucket and left in the source rather
//! than guessed at.

use lazy_static::lazy_static;
use regex::Regex;

use crate::edit::Edit;
use crate::error::MigrationError;
use crate::matcher::MatchQuery;
use crate::metrics::{Effort, MetricLabels};
use crate::pass::{PassId, PassInput, PassOutcome, TransformPass};
use crate::routes::{derive_route_target, RouteToken};
use crate::tree::kind;

pub const ROUTER_PACKAGE: &str = "@tanstack/react-router";

/// All shipped passes, in merge order.
pub fn all_passes() -> Vec<Box<dyn TransformPass>> {
    vec![
        Box::new(RouteDeclarationPass),
        Box::new(LinkComponentPass),
        Box::new(ImageComponentPass),
        Box::new(NavigationHooksPass),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTE DECLARATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Turns a default-exported page/layout component into a named component plus
/// a file-route declaration carrying the derived route token.
pub struct RouteDeclarationPass;

lazy_static! {
    static ref DEFAULT_FN_RE: Regex =
        Regex::new(r"^export default (?:async )?function ([A-Za-z_$][A-Za-z0-9_$]*)").unwrap();
}

impl TransformPass for RouteDeclarationPass {
    fn id(&self) -> PassId {
        PassId::RouteDeclaration
    }

    fn run(&self, input: &PassInput<'_>) -> Result<PassOutcome, MigrationError> {
        let target = match derive_route_target(input.file_path, input.config) {
            Some(t) if t.role.requires_declaration() => t,
            _ => return Ok(PassOutcome::Unchanged),
        };

        let hits = input.matcher.find_all(
            input.tree,
            &MatchQuery::new(kind::EXPORT_DEFAULT, "export default"),
        );
        let node = match hits.first() {
            Some(hit) => hit.node,
            None => return Ok(PassOutcome::Unchanged),
        };

        let text = input.tree.text(node);
        // rewrite only the statement's first line, so edits from content
        // passes inside the same component body keep their own targets
        let head = input.tree.children(node).next().unwrap_or(node);
        let head_text = input.tree.text(head);

        let component = match DEFAULT_FN_RE.captures(text) {
            Some(caps) => caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or("RouteComponent")
                .to_string(),
            None => "RouteComponent".to_string(),
        };
        let head_replacement = if component == "RouteComponent" {
            // anonymous function or expression export: bind it to a name
            head_text.replacen("export default", "const RouteComponent =", 1)
        } else {
            head_text.replacen("export default ", "", 1)
        };
        let mut edits = vec![Edit::new(input.tree.span(head), head_replacement)];

        let (symbol, declaration) = match &target.token {
            RouteToken::Root => (
                "createRootRoute",
                format!("export const Route = createRootRoute({{\n  component: {},\n}})", component),
            ),
            RouteToken::Path(path) => (
                "createFileRoute",
                format!(
                    "export const Route = createFileRoute('{}')({{\n  component: {},\n}})",
                    path, component
                ),
            ),
        };

        let mut tail = format!("\n{}\n", declaration);
        if !input.tree.source().contains(ROUTER_PACKAGE) {
            let import = format!("import {{ {} }} from '{}'", symbol, ROUTER_PACKAGE);
            // anchor on an import no other pass rewrites, so the merge's
            // last-write-wins never swallows this line
            let anchor = input.tree.statements().find(|id| {
                input.tree.kind(*id) == kind::IMPORT && !input.tree.text(*id).contains("next/")
            });
            match anchor {
                Some(anchor) => edits.push(Edit::new(
                    input.tree.span(anchor),
                    format!("{}\n{}", import, input.tree.text(anchor)),
                )),
                None => tail = format!("\n{}\n\n{}\n", import, declaration),
            }
        }
        edits.push(Edit::new(input.tree.span(input.tree.end_of_file()), tail));

        input
            .metrics
            .increment(&MetricLabels::automated(Effort::Medium, self.id().as_str()), 1);
        Ok(PassOutcome::Edited(edits))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LINK COMPONENT
// ═══════════════════════════════════════════════════════════════════════════════

/// `next/link` imports become router `Link` imports; `href=` props on the
/// imported component become `to=`.
pub struct LinkComponentPass;

impl TransformPass for LinkComponentPass {
    fn id(&self) -> PassId {
        PassId::LinkComponent
    }

    fn run(&self, input: &PassInput<'_>) -> Result<PassOutcome, MigrationError> {
        let imports = input.matcher.find_all(
            input.tree,
            &MatchQuery::new(kind::IMPORT, "import $NAME from 'next/link'"),
        );
        let hit = match imports.first() {
            Some(hit) => hit,
            None => return Ok(PassOutcome::Unchanged),
        };
        let local = hit.capture("NAME").unwrap_or("Link").to_string();

        let mut edits = Vec::new();
        let import = if local == "Link" {
            format!("import {{ Link }} from '{}'", ROUTER_PACKAGE)
        } else {
            format!("import {{ Link as {} }} from '{}'", local, ROUTER_PACKAGE)
        };
        edits.push(Edit::new(input.tree.span(hit.node), import));

        let href_re = Regex::new(&format!(r"(<{}\b[^>]*?)href=", regex::escape(&local)))
            .map_err(|e| pass_failed(self.id(), input, e.to_string()))?;

        let mut rewritten = 0u64;
        for node in input.tree.content_units() {
            let text = input.tree.text(node);
            let new_text = href_re.replace_all(text, "${1}to=");
            if new_text != text {
                rewritten += 1;
                edits.push(Edit::new(input.tree.span(node), new_text.into_owned()));
            }
        }

        input
            .metrics
            .increment(&MetricLabels::automated(Effort::Low, self.id().as_str()), 1 + rewritten);
        Ok(PassOutcome::from_edits(edits))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMAGE COMPONENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Drops the `next/image` import and lowers usages to plain `<img>` tags.
/// Sizing and loading semantics differ, so every lowered usage is counted as
/// manual-review work.
pub struct ImageComponentPass;

impl TransformPass for ImageComponentPass {
    fn id(&self) -> PassId {
        PassId::ImageComponent
    }

    fn run(&self, input: &PassInput<'_>) -> Result<PassOutcome, MigrationError> {
        let imports = input.matcher.find_all(
            input.tree,
            &MatchQuery::new(kind::IMPORT, "import $NAME from 'next/image'"),
        );
        let hit = match imports.first() {
            Some(hit) => hit,
            None => return Ok(PassOutcome::Unchanged),
        };
        let local = hit.capture("NAME").unwrap_or("Image").to_string();

        let mut edits = vec![Edit::new(input.tree.span(hit.node), String::new())];

        let open = format!("<{}", local);
        let close = format!("</{}>", local);
        let mut lowered = 0u64;
        for node in input.tree.content_units() {
            let text = input.tree.text(node);
            let new_text = text.replace(&open, "<img").replace(&close, "</img>");
            if new_text != text {
                lowered += 1;
                edits.push(Edit::new(input.tree.span(node), new_text));
            }
        }

        if lowered > 0 {
            input
                .metrics
                .increment(&MetricLabels::manual(Effort::Medium, self.id().as_str()), lowered);
        }
        Ok(PassOutcome::from_edits(edits))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAVIGATION HOOKS
// ═══════════════════════════════════════════════════════════════════════════════

/// `useRouter` from `next/navigation` becomes `useNavigate`. Imperative
/// `router.push(...)`-style calls are counted for manual follow-up and left
/// untouched: argument shapes differ between the routers.
pub struct NavigationHooksPass;

lazy_static! {
    static ref ROUTER_BINDING_RE: Regex =
        Regex::new(r"(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*useRouter\(\)").unwrap();
}

impl TransformPass for NavigationHooksPass {
    fn id(&self) -> PassId {
        PassId::NavigationHooks
    }

    fn run(&self, input: &PassInput<'_>) -> Result<PassOutcome, MigrationError> {
        let imports = input.matcher.find_all(
            input.tree,
            &MatchQuery::new(kind::IMPORT, "import { $$$SPECS } from 'next/navigation'"),
        );
        let hit = match imports.first() {
            Some(hit) if hit.capture("SPECS").map_or(false, |s| s.contains("useRouter")) => hit,
            _ => return Ok(PassOutcome::Unchanged),
        };

        let specs = hit.capture("SPECS").unwrap_or_default();
        let rest: Vec<&str> = specs
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "useRouter")
            .collect();

        let mut import = format!("import {{ useNavigate }} from '{}'", ROUTER_PACKAGE);
        if !rest.is_empty() {
            // hooks without a 1:1 equivalent stay on the old package
            import.push_str(&format!(
                "\nimport {{ {} }} from 'next/navigation'",
                rest.join(", ")
            ));
            input
                .metrics
                .increment(&MetricLabels::manual(Effort::High, self.id().as_str()), rest.len() as u64);
        }
        let mut edits = vec![Edit::new(input.tree.span(hit.node), import)];

        for node in input.tree.content_units() {
            let text = input.tree.text(node);
            if text.contains("useRouter()") {
                edits.push(Edit::new(
                    input.tree.span(node),
                    text.replace("useRouter()", "useNavigate()"),
                ));
            }
        }

        let binding = ROUTER_BINDING_RE
            .captures(input.tree.source())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        if let Some(name) = binding {
            let calls = ["push", "replace", "back", "forward", "prefetch"];
            let mut pending = 0u64;
            for call in calls {
                pending += input
                    .tree
                    .source()
                    .matches(&format!("{}.{}(", name, call))
                    .count() as u64;
            }
            if pending > 0 {
                input
                    .metrics
                    .increment(&MetricLabels::manual(Effort::Medium, self.id().as_str()), pending);
            }
        }

        input
            .metrics
            .increment(&MetricLabels::automated(Effort::Low, self.id().as_str()), 1);
        Ok(PassOutcome::Edited(edits))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn pass_failed(id: PassId, input: &PassInput<'_>, message: String) -> MigrationError {
    MigrationError::PassFailed {
        pass: id.as_str(),
        file: input.file_path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::edit::commit_edits;
    use crate::matcher::TextMatcher;
    use crate::metrics::{Bucket, CountingMetrics};
    use crate::orchestrator::run_passes;
    use crate::tree::SyntaxTree;
    use std::path::{Path, PathBuf};

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            project_dir: PathBuf::from("/proj"),
            app_dir: PathBuf::from("/proj/app"),
            routes_dir: PathBuf::from("/proj/src/routes"),
            enabled_passes: PassId::ALL.to_vec(),
        }
    }

    fn run_pass(pass: &dyn TransformPass, file_path: &str, source: &str) -> (String, CountingMetrics) {
        let tree = SyntaxTree::scan(source);
        let config = config();
        let metrics = CountingMetrics::new();
        let input = PassInput {
            tree: &tree,
            file_path: Path::new(file_path),
            config: &config,
            matcher: &TextMatcher,
            metrics: &metrics,
        };
        let outcome = pass.run(&input).unwrap();
        let text = commit_edits(&tree, &outcome.into_edits());
        (text, metrics)
    }

    #[test]
    fn route_declaration_rewrites_default_export() {
        let src = "import { useState } from 'react'\n\nexport default function AboutPage() {\n  return null\n}\n";
        let (out, _) = run_pass(&RouteDeclarationPass, "/proj/app/(marketing)/about/page.tsx", src);
        assert!(out.contains("import { createFileRoute } from '@tanstack/react-router'"));
        assert!(out.contains("function AboutPage()"));
        assert!(!out.contains("export default"));
        assert!(out.contains("export const Route = createFileRoute('/_marketing/about')({"));
        assert!(out.contains("component: AboutPage"));
    }

    #[test]
    fn root_layout_uses_root_form() {
        let src = "export default function RootLayout({ children }) {\n  return children\n}\n";
        let (out, _) = run_pass(&RouteDeclarationPass, "/proj/app/layout.tsx", src);
        assert!(out.contains("createRootRoute({"));
        assert!(!out.contains("createFileRoute("));
    }

    #[test]
    fn anonymous_default_export_gets_a_name() {
        let src = "export default () => null\n";
        let (out, _) = run_pass(&RouteDeclarationPass, "/proj/app/page.tsx", src);
        assert!(out.contains("const RouteComponent = () => null"));
        assert!(out.contains("component: RouteComponent"));
    }

    #[test]
    fn route_declaration_skips_excluded_files() {
        let src = "export default function Modal() {\n  return null\n}\n";
        let tree = SyntaxTree::scan(src);
        let config = config();
        let metrics = CountingMetrics::new();
        let input = PassInput {
            tree: &tree,
            file_path: Path::new("/proj/app/@modal/photo/page.tsx"),
            config: &config,
            matcher: &TextMatcher,
            metrics: &metrics,
        };
        assert_eq!(RouteDeclarationPass.run(&input).unwrap(), PassOutcome::Unchanged);
    }

    #[test]
    fn link_pass_rewrites_import_and_href() {
        let src = "import Link from 'next/link'\n\nexport default function Nav() {\n  return <Link href=\"/about\">About</Link>\n}\n";
        let (out, metrics) = run_pass(&LinkComponentPass, "/proj/app/page.tsx", src);
        assert!(out.contains("import { Link } from '@tanstack/react-router'"));
        assert!(out.contains("<Link to=\"/about\">"));
        assert!(!out.contains("href="));
        assert!(metrics.bucket_total(Bucket::Automated) >= 2);
    }

    #[test]
    fn link_pass_preserves_local_alias() {
        let src = "import NavLink from 'next/link'\nconst el = <NavLink href=\"/\">home</NavLink>\n";
        let (out, _) = run_pass(&LinkComponentPass, "/proj/app/page.tsx", src);
        assert!(out.contains("import { Link as NavLink } from '@tanstack/react-router'"));
        assert!(out.contains("<NavLink to=\"/\">"));
    }

    #[test]
    fn image_pass_lowers_to_img_and_counts_manual_work() {
        let src = "import Image from 'next/image'\n\nexport default function Hero() {\n  return <Image src=\"/a.png\" fill />\n}\n";
        let (out, metrics) = run_pass(&ImageComponentPass, "/proj/app/page.tsx", src);
        assert!(!out.contains("next/image"));
        assert!(out.contains("<img src=\"/a.png\" fill />"));
        assert_eq!(metrics.bucket_total(Bucket::Manual), 1);
    }

    #[test]
    fn navigation_pass_rewrites_hook_and_flags_imperative_calls() {
        let src = "import { useRouter } from 'next/navigation'\n\nexport default function Form() {\n  const router = useRouter()\n  const onDone = () => router.push('/done')\n  return null\n}\n";
        let (out, metrics) = run_pass(&NavigationHooksPass, "/proj/app/page.tsx", src);
        assert!(out.contains("import { useNavigate } from '@tanstack/react-router'"));
        assert!(out.contains("const router = useNavigate()"));
        // the push call is left alone, counted as manual follow-up
        assert!(out.contains("router.push('/done')"));
        assert_eq!(metrics.bucket_total(Bucket::Manual), 1);
    }

    #[test]
    fn single_line_default_export_collapses_to_the_later_pass() {
        // a one-line default export is a single node, so the declaration
        // pass's head rewrite and a content pass's rewrite share the target;
        // merge policy keeps the later pass and the appended declaration
        // still lands
        let src = "import Link from 'next/link'\nexport default function Home() { return <Link href=\"/a\">a</Link> }\n";
        let tree = SyntaxTree::scan(src);
        let config = config();
        let metrics = CountingMetrics::new();
        let input = PassInput {
            tree: &tree,
            file_path: Path::new("/proj/app/page.tsx"),
            config: &config,
            matcher: &TextMatcher,
            metrics: &metrics,
        };
        let out = run_passes(&all_passes(), &input).unwrap();
        let text = out.text.unwrap();
        assert!(text.contains("to=\"/a\""));
        assert!(text.contains("export default function Home()"));
        assert!(text.contains("createFileRoute('/')"));
    }

    #[test]
    fn navigation_pass_keeps_unmapped_hooks_on_old_package() {
        let src = "import { useRouter, usePathname } from 'next/navigation'\nconst r = useRouter()\n";
        let (out, metrics) = run_pass(&NavigationHooksPass, "/proj/app/page.tsx", src);
        assert!(out.contains("import { useNavigate } from '@tanstack/react-router'"));
        assert!(out.contains("import { usePathname } from 'next/navigation'"));
        assert_eq!(metrics.bucket_total(Bucket::Manual), 1);
    }
}
