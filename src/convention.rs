//! Test-artifact convention
//!
//! Deciding whether a path or function is a test is a single pluggable
//! predicate so traversal code never inlines pattern checks.

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Predicate deciding whether a file (and optionally a function in it) is a test.
pub trait TestConvention: Send + Sync {
    /// `name` is the function name when one is known (graph callers); changed
    /// files are checked by path alone.
    fn is_test_artifact(&self, path: &str, name: Option<&str>) -> bool;
}

/// Directory names that mark everything beneath them as tests
const TEST_DIRS: &[&str] = &["tests", "test", "__tests__", "spec", "specs"];

/// File-name infixes/suffixes that mark test files across ecosystems
/// (`foo_test.go`, `foo.test.ts`, `foo.spec.js`, `foo_spec.rb`)
const TEST_FILE_MARKERS: &[&str] = &["_test.", ".test.", ".spec.", "_spec."];

/// True if the path looks like a test file, by directory or file name.
pub fn is_test_path(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let mut parts = normalized.split('/').collect::<Vec<_>>();
    let Some(file) = parts.pop() else {
        return false;
    };
    if parts.iter().any(|p| TEST_DIRS.contains(p)) {
        return true;
    }
    let file = file.to_ascii_lowercase();
    file.starts_with("test_") || TEST_FILE_MARKERS.iter().any(|m| file.contains(m))
}

/// True if a function name follows a test naming convention.
pub fn is_test_name(name: &str, prefixes: &[String]) -> bool {
    // Qualified names (`module.Class.method`, `crate::tests::it_works`)
    let short = name.rsplit(['.', ':']).next().unwrap_or(name);
    prefixes.iter().any(|p| short.starts_with(p.as_str()))
        || short.ends_with("_test")
        || short.contains("_test_")
        || name.contains("::tests::")
}

/// Path markers, name prefixes, and user-supplied globs.
#[derive(Debug, Clone)]
pub struct DefaultTestConvention {
    name_prefixes: Vec<String>,
    extra: GlobSet,
}

impl Default for DefaultTestConvention {
    fn default() -> Self {
        Self::new(&["test_".to_string(), "Test".to_string()], &[])
    }
}

impl DefaultTestConvention {
    /// Invalid globs are logged and skipped.
    pub fn new(name_prefixes: &[String], extra_globs: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in extra_globs {
            match Glob::new(pattern) {
                Ok(g) => {
                    builder.add(g);
                }
                Err(e) => tracing::warn!(pattern, error = %e, "Ignoring invalid test glob"),
            }
        }
        let extra = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build test glob set, ignoring extra globs");
            GlobSet::empty()
        });
        Self {
            name_prefixes: name_prefixes.to_vec(),
            extra,
        }
    }
}

impl TestConvention for DefaultTestConvention {
    fn is_test_artifact(&self, path: &str, name: Option<&str>) -> bool {
        is_test_path(path)
            || self.extra.is_match(path)
            || name.is_some_and(|n| is_test_name(n, &self.name_prefixes))
    }
}
