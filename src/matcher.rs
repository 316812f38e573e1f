//! Structural pattern-matcher boundary.
//!
//! The engine never implements general tree matching; it composes queries
//! (a node-kind filter plus a pattern with ordered wildcard captures) and
//! consumes typed hits. `TextMatcher` is a small bundled implementation that
//! matches patterns against whitespace-normalized node text, enough for the
//! statement-level rewrites this crate ships. A richer engine can be swapped
//! in behind the same trait.
//!
//! Pattern syntax: literal text, `$NAME` for a single capture (text up to the
//! next literal fragment), `$$$NAME` for a greedy multi-capture. Capture
//! names are `[A-Z0-9_]+`.

use std::collections::HashMap;

use crate::tree::{NodeId, SyntaxTree};

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY AND HIT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct MatchQuery {
    /// Restrict matching to nodes of this kind; `None` matches any kind.
    pub kind: Option<&'static str>,
    pub pattern: String,
}

impl MatchQuery {
    pub fn new(kind: &'static str, pattern: impl Into<String>) -> Self {
        MatchQuery {
            kind: Some(kind),
            pattern: pattern.into(),
        }
    }

    pub fn any_kind(pattern: impl Into<String>) -> Self {
        MatchQuery {
            kind: None,
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchHit {
    pub node: NodeId,
    pub captures: HashMap<String, String>,
}

impl MatchHit {
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }
}

pub trait PatternMatcher: Send + Sync {
    /// All nodes matching the query, in source order.
    fn find_all(&self, tree: &SyntaxTree, query: &MatchQuery) -> Vec<MatchHit>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUNDLED TEXT-LEVEL MATCHER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct TextMatcher;

#[derive(Debug, Clone, PartialEq)]
enum PatternPart {
    Literal(String),
    Capture(String),
    MultiCapture(String),
}

fn parse_pattern(pattern: &str) -> Vec<PatternPart> {
    let normalized = normalize_ws(pattern);
    let mut parts = Vec::new();
    let mut literal = String::new();
    let bytes = normalized.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' {
            let multi = normalized[i..].starts_with("$$$");
            let name_start = if multi { i + 3 } else { i + 1 };
            let name_end = normalized[name_start..]
                .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
                .map(|off| name_start + off)
                .unwrap_or(normalized.len());
            if name_end > name_start {
                if !literal.is_empty() {
                    parts.push(PatternPart::Literal(std::mem::take(&mut literal)));
                }
                let name = normalized[name_start..name_end].to_string();
                parts.push(if multi {
                    PatternPart::MultiCapture(name)
                } else {
                    PatternPart::Capture(name)
                });
                i = name_end;
                continue;
            }
        }
        literal.push(bytes[i] as char);
        i += 1;
    }
    if !literal.is_empty() {
        parts.push(PatternPart::Literal(literal));
    }
    parts
}

fn normalize_ws(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_ws = true;
        } else {
            if in_ws && !out.is_empty() {
                out.push(' ');
            }
            in_ws = false;
            out.push(c);
        }
    }
    out
}

/// Match the parsed pattern against normalized node text. Literal fragments
/// must appear in order; captures bind the text between them.
fn match_parts(parts: &[PatternPart], text: &str) -> Option<HashMap<String, String>> {
    let mut captures = HashMap::new();
    let mut pos = 0;

    let mut idx = 0;
    while idx < parts.len() {
        match &parts[idx] {
            PatternPart::Literal(lit) => {
                let found = text[pos..].find(lit.as_str())?;
                // The first fragment may start anywhere; fragments after a
                // capture bind the capture to the gap.
                pos += found + lit.len();
                idx += 1;
            }
            PatternPart::Capture(name) | PatternPart::MultiCapture(name) => {
                let greedy = matches!(&parts[idx], PatternPart::MultiCapture(_));
                match parts.get(idx + 1) {
                    Some(PatternPart::Literal(lit)) => {
                        let found = if greedy {
                            text[pos..].rfind(lit.as_str())?
                        } else {
                            text[pos..].find(lit.as_str())?
                        };
                        let bound = text[pos..pos + found].trim();
                        if !greedy && bound.is_empty() && !name.is_empty() {
                            // single capture must bind something
                            return None;
                        }
                        captures.insert(name.clone(), bound.to_string());
                        pos += found + lit.len();
                        idx += 2;
                    }
                    Some(_) => {
                        // adjacent captures are ambiguous; refuse the match
                        return None;
                    }
                    None => {
                        captures.insert(name.clone(), text[pos..].trim().to_string());
                        pos = text.len();
                        idx += 1;
                    }
                }
            }
        }
    }
    let _ = pos;
    Some(captures)
}

impl PatternMatcher for TextMatcher {
    fn find_all(&self, tree: &SyntaxTree, query: &MatchQuery) -> Vec<MatchHit> {
        let parts = parse_pattern(&query.pattern);
        let mut hits = Vec::new();
        for node in tree.statements() {
            if let Some(kind) = query.kind {
                if tree.kind(node) != kind {
                    continue;
                }
            }
            let text = normalize_ws(tree.text(node));
            if let Some(captures) = match_parts(&parts, &text) {
                hits.push(MatchHit { node, captures });
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::kind;

    #[test]
    fn parses_captures_and_literals() {
        let parts = parse_pattern("import $NAME from 'next/link'");
        assert_eq!(
            parts,
            vec![
                PatternPart::Literal("import ".into()),
                PatternPart::Capture("NAME".into()),
                PatternPart::Literal(" from 'next/link'".into()),
            ]
        );
    }

    #[test]
    fn matches_import_statement() {
        let tree = SyntaxTree::scan("import Link from 'next/link'\nconst x = 1\n");
        let hits = TextMatcher.find_all(
            &tree,
            &MatchQuery::new(kind::IMPORT, "import $NAME from 'next/link'"),
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].capture("NAME"), Some("Link"));
    }

    #[test]
    fn multi_capture_spans_params() {
        let tree = SyntaxTree::scan(
            "export default function Page({ params, children }) {\n  return null\n}\n",
        );
        let hits = TextMatcher.find_all(
            &tree,
            &MatchQuery::new(
                kind::EXPORT_DEFAULT,
                "export default function $NAME($$$PARAMS)",
            ),
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].capture("NAME"), Some("Page"));
        assert_eq!(hits[0].capture("PARAMS"), Some("{ params, children }"));
    }

    #[test]
    fn kind_filter_excludes_other_nodes() {
        let tree = SyntaxTree::scan("const Link = 1\n");
        let hits = TextMatcher.find_all(&tree, &MatchQuery::new(kind::IMPORT, "Link"));
        assert!(hits.is_empty());
    }

    #[test]
    fn whitespace_is_normalized_before_matching() {
        let tree = SyntaxTree::scan("import   Link    from   'next/link'\n");
        let hits = TextMatcher.find_all(
            &tree,
            &MatchQuery::new(kind::IMPORT, "import $NAME from 'next/link'"),
        );
        assert_eq!(hits.len(), 1);
    }
}
