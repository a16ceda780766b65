//! Structural comparison for the classifier's second stage
//!
//! Both sides of a changed region are dedented, parsed with the language's
//! tree-sitter grammar and flattened into a token/node-kind sequence that
//! ignores whitespace, comments and documentation statements. Equal
//! sequences mean the edit cannot change behaviour.

use tree_sitter::{Node, Parser};

use crate::language::Language;

/// Outcome of comparing the old and new text of a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralVerdict {
    /// Same syntax once whitespace, comments and docs are dropped
    Equivalent,
    /// Syntax differs
    Differs,
    /// Could not decide (no grammar, or a side did not parse cleanly)
    Ambiguous(String),
}

/// Remove the common leading indentation of all non-blank lines.
///
/// Fragments cut out of a function body are indented; indentation-sensitive
/// grammars need them moved to column zero before parsing.
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if line.trim().is_empty() {
            out.push('\n');
            continue;
        }
        let cut = indent.min(line.len() - line.trim_start().len());
        out.push_str(&line[cut..]);
        out.push('\n');
    }
    out
}

/// Flatten a parsed fragment into a comparable sequence.
///
/// Named nodes contribute their kind and a closing marker (so nesting is
/// part of the fingerprint), leaves contribute their source text. Returns
/// `None` when the fragment has parse errors.
pub fn fingerprint(language: Language, source: &str) -> Option<Vec<String>> {
    let grammar = language.grammar();
    let mut parser = Parser::new();
    if parser.set_language(&grammar).is_err() {
        tracing::warn!(%language, "Failed to load grammar for structural comparison");
        return None;
    }
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }

    let doc_statements = language.def().doc_statements;
    let mut out = Vec::new();
    collect(root, source, doc_statements, &mut out);
    Some(out)
}

fn is_doc_statement(node: Node<'_>, doc_statements: &[(&str, &str)]) -> bool {
    doc_statements.iter().any(|(parent, child)| {
        node.kind() == *parent
            && node.named_child_count() == 1
            && node.named_child(0).is_some_and(|c| c.kind() == *child)
    })
}

fn collect(node: Node<'_>, source: &str, doc_statements: &[(&str, &str)], out: &mut Vec<String>) {
    if node.is_extra() || node.kind().contains("comment") {
        return;
    }
    if is_doc_statement(node, doc_statements) {
        return;
    }

    if node.child_count() == 0 {
        let text = &source[node.byte_range()];
        out.push(if text.is_empty() {
            node.kind().to_string()
        } else {
            text.to_string()
        });
        return;
    }

    if node.is_named() {
        out.push(node.kind().to_string());
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, source, doc_statements, out);
    }
    if node.is_named() {
        out.push(")".to_string());
    }
}

/// Compare the old and new text of a changed region.
pub fn compare(language: Language, old: &str, new: &str) -> StructuralVerdict {
    let _span = tracing::debug_span!("structural_compare", %language).entered();

    let old = dedent(old);
    let new = dedent(new);
    let Some(old_fp) = fingerprint(language, &old) else {
        return StructuralVerdict::Ambiguous("pre-change text did not parse".into());
    };
    let Some(new_fp) = fingerprint(language, &new) else {
        return StructuralVerdict::Ambiguous("post-change text did not parse".into());
    };

    if old_fp == new_fp {
        StructuralVerdict::Equivalent
    } else {
        StructuralVerdict::Differs
    }
}
