//! Python language definition

use std::sync::LazyLock;

use regex::Regex;

use super::{compile_patterns, LanguageDef};

/// `def name(` and `async def name(` at any indentation
static DEFINITIONS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile_patterns(&[r"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)\s*\("]));

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:import\s+[\w.]+|from\s+[\w.]+\s+import\s+)").expect("hardcoded regex")
});

/// Docstrings are expression_statements whose only child is a string
const DOC_STATEMENTS: &[(&str, &str)] = &[("expression_statement", "string")];

static DEFINITION: LanguageDef = LanguageDef {
    name: "python",
    grammar: || tree_sitter_python::LANGUAGE.into(),
    extensions: &["py", "pyi"],
    definitions: &DEFINITIONS,
    reserved_names: &[],
    decorator_prefixes: &["@"],
    line_comments: &["#"],
    doc_delimiters: &[("\"\"\"", "\"\"\""), ("'''", "'''")],
    import: &IMPORT,
    doc_statements: DOC_STATEMENTS,
};

pub fn definition() -> &'static LanguageDef {
    &DEFINITION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_def() {
        let def = definition();
        assert_eq!(def.match_definition("def foo(x):"), Some("foo"));
        assert_eq!(def.match_definition("    async def fetch_all(self):"), Some("fetch_all"));
        assert_eq!(def.match_definition("    return foo(x)"), None);
        assert_eq!(def.match_definition("class Foo:"), None);
    }

    #[test]
    fn test_imports_and_comments() {
        let def = definition();
        assert!(def.is_import("import os"));
        assert!(def.is_import("from app.payment import charge"));
        assert!(!def.is_import("imported = True"));
        assert!(def.is_line_comment("    # note"));
        assert!(def.is_decorator("    @pytest.fixture"));
    }
}
