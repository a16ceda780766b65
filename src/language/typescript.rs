//! TypeScript language definition

use std::sync::LazyLock;

use regex::Regex;

use super::{compile_patterns, LanguageDef};

/// Function declarations, arrow-function bindings and class methods
static DEFINITIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*[<(]",
        r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|(?:<[^>]*>)?\([^)]*\)\s*(?::[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)",
        r"^\s*(?:(?:public|private|protected|static|readonly|abstract|override|async)\s+)*(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\([^)]*\)\s*(?::\s*[^{]+)?\{\s*$",
    ])
});

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:import\s|export\s+(?:\*|\{[^}]*\})\s+from\s|(?:const|let|var)\s+\w+\s*=\s*require\()"#)
        .expect("hardcoded regex")
});

static DEFINITION: LanguageDef = LanguageDef {
    name: "typescript",
    grammar: || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    extensions: &["ts", "tsx", "mts", "cts"],
    definitions: &DEFINITIONS,
    reserved_names: &["if", "for", "while", "switch", "catch", "return", "function", "constructor"],
    decorator_prefixes: &["@"],
    line_comments: &["//"],
    doc_delimiters: &[("/*", "*/")],
    import: &IMPORT,
    doc_statements: &[],
};

pub fn definition() -> &'static LanguageDef {
    &DEFINITION
}
