//! Per-file syntax-tree snapshot.
//!
//! One `SyntaxTree` is built per file and owned by a single pipeline run.
//! Passes only read it; rewrites are expressed as span-keyed edits
//! (`crate::edit`) so node identity never depends on object addresses.
//!
//! The bundled scanner is deliberately shallow: it splits a module into
//! top-level statement nodes by tracking bracket depth outside strings and
//! comments. Semantic matching on top of those nodes belongs to the
//! `PatternMatcher` boundary, not to this module.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// SPANS AND NODE IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte range into the file's source. Doubles as the stable node key used by
/// the edit model: two nodes of one tree never share a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Stable structural key for a node within one tree.
pub type NodeKey = Span;

/// Index into a tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Node classification produced by the scanner.
pub mod kind {
    pub const SOURCE_FILE: &str = "source_file";
    pub const IMPORT: &str = "import";
    pub const EXPORT_DEFAULT: &str = "export_default";
    pub const EXPORT: &str = "export";
    pub const STATEMENT: &str = "statement";
    /// One line of a multi-line statement. Passes prefer these over whole
    /// statements so independent rewrites rarely share a target node.
    pub const LINE: &str = "line";
    /// Zero-width insertion point at the end of the file.
    pub const EOF: &str = "eof";
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: &'static str,
    span: Span,
    parent: Option<usize>,
    children: Vec<usize>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    /// Build a snapshot from source. Node 0 is the `source_file` root; its
    /// children are top-level statements in source order, plus a zero-width
    /// `eof` node. Multi-line statements get one `line` child per non-blank
    /// line.
    pub fn scan(source: &str) -> SyntaxTree {
        let mut tree = SyntaxTree {
            source: source.to_string(),
            nodes: vec![NodeData {
                kind: kind::SOURCE_FILE,
                span: Span::new(0, source.len()),
                parent: None,
                children: Vec::new(),
            }],
        };

        for span in scan_statements(source) {
            let text = &source[span.start..span.end];
            let child_kind = classify_statement(text);
            let idx = tree.nodes.len();
            tree.nodes.push(NodeData {
                kind: child_kind,
                span,
                parent: Some(0),
                children: Vec::new(),
            });
            tree.nodes[0].children.push(idx);

            if text.contains('\n') {
                let mut offset = span.start;
                for line in text.split_inclusive('\n') {
                    let body = line.trim_end_matches(['\n', '\r']);
                    if !body.trim().is_empty() {
                        let line_idx = tree.nodes.len();
                        tree.nodes.push(NodeData {
                            kind: kind::LINE,
                            span: Span::new(offset, offset + body.len()),
                            parent: Some(idx),
                            children: Vec::new(),
                        });
                        tree.nodes[idx].children.push(line_idx);
                    }
                    offset += line.len();
                }
            }
        }

        let eof_idx = tree.nodes.len();
        tree.nodes.push(NodeData {
            kind: kind::EOF,
            span: Span::new(source.len(), source.len()),
            parent: Some(0),
            children: Vec::new(),
        });
        tree.nodes[0].children.push(eof_idx);

        tree
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> &'static str {
        self.nodes[id.0].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span
    }

    pub fn text(&self, id: NodeId) -> &str {
        let span = self.nodes[id.0].span;
        &self.source[span.start..span.end]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent.map(NodeId)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().copied().map(NodeId)
    }

    /// All nodes in source order, root first.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Top-level statements only.
    pub fn statements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children(self.root())
            .filter(|id| self.nodes[id.0].kind != kind::EOF)
    }

    /// The zero-width insertion point at the end of the file.
    pub fn end_of_file(&self) -> NodeId {
        NodeId(self.nodes.len() - 1)
    }

    /// The units content passes rewrite: line nodes of multi-line statements
    /// and whole single-line statements. Imports are excluded; they are
    /// rewritten through their own statement nodes.
    pub fn content_units(&self) -> Vec<NodeId> {
        let mut units = Vec::new();
        for stmt in self.statements() {
            if self.kind(stmt) == kind::IMPORT {
                continue;
            }
            let lines: Vec<NodeId> = self.children(stmt).collect();
            if lines.is_empty() {
                units.push(stmt);
            } else {
                units.extend(lines);
            }
        }
        units
    }
}

fn classify_statement(text: &str) -> &'static str {
    let trimmed = text.trim_start();
    if trimmed.starts_with("import ") || trimmed.starts_with("import{") {
        kind::IMPORT
    } else if trimmed.starts_with("export default") {
        kind::EXPORT_DEFAULT
    } else if trimmed.starts_with("export ") {
        kind::EXPORT
    } else {
        kind::STATEMENT
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENT SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(PartialEq)]
enum ScanState {
    Code,
    Single,
    Double,
    Template,
    LineComment,
    BlockComment,
}

/// Split source into top-level statement spans. A statement ends at a newline
/// reached with zero bracket depth. Strings, template literals and comments
/// never contribute to depth.
fn scan_statements(source: &str) -> Vec<Span> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut state = ScanState::Code;
    let mut depth: i64 = 0;
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match state {
            ScanState::Code => {
                match c {
                    b'\'' => state = ScanState::Single,
                    b'"' => state = ScanState::Double,
                    b'`' => state = ScanState::Template,
                    b'/' if bytes.get(i + 1) == Some(&b'/') => state = ScanState::LineComment,
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        state = ScanState::BlockComment;
                        i += 1;
                    }
                    b'{' | b'(' | b'[' => depth += 1,
                    b'}' | b')' | b']' => depth -= 1,
                    _ => {}
                }
                if c == b'\n' {
                    if depth <= 0 {
                        if let Some(s) = start.take() {
                            if !source[s..i].trim().is_empty() {
                                spans.push(Span::new(s, i));
                            }
                        }
                        depth = depth.max(0);
                    }
                } else if start.is_none() && !(c as char).is_whitespace() {
                    start = Some(i);
                }
            }
            ScanState::Single => match c {
                b'\\' => i += 1,
                b'\'' | b'\n' => state = ScanState::Code,
                _ => {}
            },
            ScanState::Double => match c {
                b'\\' => i += 1,
                b'"' | b'\n' => state = ScanState::Code,
                _ => {}
            },
            ScanState::Template => match c {
                b'\\' => i += 1,
                b'`' => state = ScanState::Code,
                _ => {}
            },
            ScanState::LineComment => {
                if c == b'\n' {
                    state = ScanState::Code;
                    if depth <= 0 {
                        if let Some(s) = start.take() {
                            if !source[s..i].trim().is_empty() {
                                spans.push(Span::new(s, i));
                            }
                        }
                    }
                }
            }
            ScanState::BlockComment => {
                if c == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = ScanState::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    if let Some(s) = start {
        if !source[s..].trim().is_empty() {
            let end = source.trim_end().len().max(s);
            spans.push(Span::new(s, end));
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"import Link from 'next/link'
import { useState } from 'react'

const GREETING = 'hello { not a brace }'

export default function AboutPage() {
  const [n] = useState(0)
  return <Link href="/about">{GREETING} {n}</Link>
}
"#;

    #[test]
    fn scans_top_level_statements() {
        let tree = SyntaxTree::scan(SAMPLE);
        let kinds: Vec<&str> = tree.statements().map(|id| tree.kind(id)).collect();
        assert_eq!(
            kinds,
            vec![kind::IMPORT, kind::IMPORT, kind::STATEMENT, kind::EXPORT_DEFAULT]
        );
    }

    #[test]
    fn function_bodies_stay_in_one_node() {
        let tree = SyntaxTree::scan(SAMPLE);
        let export = tree
            .statements()
            .find(|id| tree.kind(*id) == kind::EXPORT_DEFAULT)
            .unwrap();
        let text = tree.text(export);
        assert!(text.starts_with("export default function AboutPage()"));
        assert!(text.trim_end().ends_with('}'));
        assert!(text.contains("useState(0)"));
    }

    #[test]
    fn braces_inside_strings_do_not_split_statements() {
        let tree = SyntaxTree::scan(SAMPLE);
        let stmt = tree
            .statements()
            .find(|id| tree.kind(*id) == kind::STATEMENT)
            .unwrap();
        assert_eq!(tree.text(stmt), "const GREETING = 'hello { not a brace }'");
    }

    #[test]
    fn spans_are_stable_keys() {
        let tree = SyntaxTree::scan(SAMPLE);
        for id in tree.statements() {
            let span = tree.span(id);
            assert_eq!(tree.text(id), &SAMPLE[span.start..span.end]);
        }
    }

    #[test]
    fn comments_do_not_affect_depth() {
        let src = "// a comment with {{{\nconst x = 1\n/* } */ const y = 2\n";
        let tree = SyntaxTree::scan(src);
        let texts: Vec<&str> = tree.statements().map(|id| tree.text(id)).collect();
        assert!(texts.iter().any(|t| t.contains("const x = 1")));
        assert!(texts.iter().any(|t| t.contains("const y = 2")));
    }

    #[test]
    fn multi_line_statements_expose_line_children() {
        let tree = SyntaxTree::scan(SAMPLE);
        let export = tree
            .statements()
            .find(|id| tree.kind(*id) == kind::EXPORT_DEFAULT)
            .unwrap();
        let lines: Vec<&str> = tree.children(export).map(|id| tree.text(id)).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "export default function AboutPage() {");
        assert_eq!(lines[3], "}");
        // single-line statements have no line children
        let import = tree.statements().next().unwrap();
        assert_eq!(tree.children(import).count(), 0);
    }

    #[test]
    fn eof_node_is_a_zero_width_insertion_point() {
        let tree = SyntaxTree::scan(SAMPLE);
        let eof = tree.end_of_file();
        assert_eq!(tree.kind(eof), kind::EOF);
        assert!(tree.span(eof).is_empty());
        assert_eq!(tree.span(eof).start, SAMPLE.len());
        // statements() never yields it
        assert!(tree.statements().all(|id| id != eof));
    }

    #[test]
    fn content_units_skip_imports_and_prefer_lines() {
        let tree = SyntaxTree::scan(SAMPLE);
        let units = tree.content_units();
        assert!(units.iter().all(|id| tree.kind(*id) != kind::IMPORT));
        assert!(units.iter().any(|id| tree.text(*id).contains("href=")));
        // the multi-line export contributes lines, not itself
        assert!(units
            .iter()
            .all(|id| tree.kind(*id) == kind::LINE || !tree.text(*id).contains('\n')));
    }
}
