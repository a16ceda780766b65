//! Language registry for diff analysis
//!
//! Each supported language contributes the line-level patterns the diff
//! parser and the heuristic classifier need (definition lines, decorators,
//! comments, doc blocks, imports) plus the tree-sitter grammar used by the
//! structural classifier stage.
//!
//! Languages are registered at compile time based on feature flags.
//!
//! # Feature Flags
//!
//! - `lang-rust` - Rust support (enabled by default)
//! - `lang-python` - Python support (enabled by default)
//! - `lang-typescript` - TypeScript support (enabled by default)
//! - `lang-javascript` - JavaScript support (enabled by default)
//! - `lang-all` - All languages

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

#[cfg(feature = "lang-javascript")]
mod javascript;
#[cfg(feature = "lang-python")]
mod python;
#[cfg(feature = "lang-rust")]
mod rust;
#[cfg(feature = "lang-typescript")]
mod typescript;

/// A language definition with all line patterns and the parsing grammar
pub struct LanguageDef {
    /// Language name (e.g., "rust", "python")
    pub name: &'static str,
    /// Function to get the tree-sitter grammar
    pub grammar: fn() -> tree_sitter::Language,
    /// File extensions for this language
    pub extensions: &'static [&'static str],
    /// Definition-line patterns. Each regex exposes the function name as the `name` group.
    pub definitions: &'static LazyLock<Vec<Regex>>,
    /// Identifiers that definition patterns may capture but are never function names
    /// (control-flow keywords caught by method-shorthand patterns)
    pub reserved_names: &'static [&'static str],
    /// Line prefixes (after indentation) of decorators/attributes that attach to the next definition
    pub decorator_prefixes: &'static [&'static str],
    /// Line comment prefixes (after indentation)
    pub line_comments: &'static [&'static str],
    /// Open/close delimiters of doc blocks (docstrings, block comments)
    pub doc_delimiters: &'static [(&'static str, &'static str)],
    /// Import/include statement pattern
    pub import: &'static LazyLock<Regex>,
    /// `(parent, only_child)` node kinds treated as inert documentation by the
    /// structural stage (e.g. a Python docstring is an `expression_statement`
    /// whose only child is a `string`)
    pub doc_statements: &'static [(&'static str, &'static str)],
}

impl LanguageDef {
    /// Match a definition line, returning the defined function name.
    pub fn match_definition<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.definitions.iter().find_map(|re| {
            let name = re.captures(line)?.name("name")?.as_str();
            (!self.reserved_names.contains(&name)).then_some(name)
        })
    }

    /// True if the line (any indentation) is a decorator or attribute line.
    pub fn is_decorator(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.decorator_prefixes.iter().any(|p| trimmed.starts_with(p))
    }

    /// True if the line (any indentation) is a line comment.
    pub fn is_line_comment(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.line_comments.iter().any(|p| trimmed.starts_with(p))
    }

    /// True if the line is an import/include statement.
    pub fn is_import(&self, line: &str) -> bool {
        self.import.is_match(line)
    }
}

/// Compile a list of hardcoded patterns. Used by the per-language `LazyLock`s.
fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("hardcoded language pattern"))
        .collect()
}

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Rust (.rs files)
    Rust,
    /// Python (.py, .pyi files)
    Python,
    /// TypeScript (.ts, .tsx files)
    TypeScript,
    /// JavaScript (.js, .jsx, .mjs, .cjs files)
    JavaScript,
}

impl Language {
    /// Get the language definition from the registry.
    ///
    /// `Language` values are only produced from registered definitions
    /// (`from_extension`, `from_path`), so the lookup cannot miss.
    pub fn def(&self) -> &'static LanguageDef {
        REGISTRY
            .get(&self.to_string())
            .expect("language not in registry, check feature flags")
    }

    /// Look up a language by file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        REGISTRY
            .from_extension(ext)
            .and_then(|def| Self::from_def_name(def.name))
    }

    fn from_def_name(name: &str) -> Option<Self> {
        match name {
            "rust" => Some(Language::Rust),
            "python" => Some(Language::Python),
            "typescript" => Some(Language::TypeScript),
            "javascript" => Some(Language::JavaScript),
            _ => None,
        }
    }

    /// Look up a language from a (possibly relative, slash-separated) path
    pub fn from_path(path: &str) -> Option<Self> {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the tree-sitter grammar for this language
    pub fn grammar(&self) -> tree_sitter::Language {
        (self.def().grammar)()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Rust => write!(f, "rust"),
            Language::Python => write!(f, "python"),
            Language::TypeScript => write!(f, "typescript"),
            Language::JavaScript => write!(f, "javascript"),
        }
    }
}

/// Global language registry
pub static REGISTRY: LazyLock<LanguageRegistry> = LazyLock::new(LanguageRegistry::new);

/// Registry of all supported languages
pub struct LanguageRegistry {
    /// Languages indexed by name
    by_name: HashMap<&'static str, &'static LanguageDef>,
    /// Languages indexed by extension
    by_extension: HashMap<&'static str, &'static LanguageDef>,
}

impl LanguageRegistry {
    /// Create a new registry with all enabled languages
    fn new() -> Self {
        let mut reg = Self {
            by_name: HashMap::new(),
            by_extension: HashMap::new(),
        };

        #[cfg(feature = "lang-rust")]
        reg.register(rust::definition());

        #[cfg(feature = "lang-python")]
        reg.register(python::definition());

        #[cfg(feature = "lang-typescript")]
        reg.register(typescript::definition());

        #[cfg(feature = "lang-javascript")]
        reg.register(javascript::definition());

        reg
    }

    fn register(&mut self, def: &'static LanguageDef) {
        self.by_name.insert(def.name, def);
        for ext in def.extensions {
            self.by_extension.insert(*ext, def);
        }
    }

    /// Get a language definition by name
    pub fn get(&self, name: &str) -> Option<&'static LanguageDef> {
        self.by_name.get(name).copied()
    }

    /// Get a language definition by file extension
    pub fn from_extension(&self, ext: &str) -> Option<&'static LanguageDef> {
        self.by_extension.get(ext).copied()
    }
}
