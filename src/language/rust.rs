//! Rust language definition

use std::sync::LazyLock;

use regex::Regex;

use super::{compile_patterns, LanguageDef};

/// `fn name` with any combination of visibility and qualifiers
static DEFINITIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+(?:"[^"]*"\s+)?)?fn\s+(?P<name>[A-Za-z_]\w*)"#,
    ])
});

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:use\s+\S|extern\s+crate\s+|mod\s+\w+\s*;)")
        .expect("hardcoded regex")
});

static DEFINITION: LanguageDef = LanguageDef {
    name: "rust",
    grammar: || tree_sitter_rust::LANGUAGE.into(),
    extensions: &["rs"],
    definitions: &DEFINITIONS,
    reserved_names: &[],
    decorator_prefixes: &["#["],
    line_comments: &["//"],
    doc_delimiters: &[("/*", "*/")],
    import: &IMPORT,
    doc_statements: &[],
};

pub fn definition() -> &'static LanguageDef {
    &DEFINITION
}
