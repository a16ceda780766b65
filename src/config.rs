//! Configuration file support for testradar
//!
//! Config files are loaded in order (later overrides earlier):
//! 1. `~/.config/testradar/config.toml` (user defaults)
//! 2. `.testradar.toml` in project root (project overrides)
//!
//! CLI flags and environment variables override all config file values.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::convention::DefaultTestConvention;
use crate::impact::AnalyzerOptions;
use crate::request::RequestLimits;

/// `[tests]` table: how test artifacts are recognised
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TestsConfig {
    /// Extra glob patterns marking test files (e.g. `"qa/**/*.py"`)
    pub extra_globs: Vec<String>,
    /// Function-name prefixes marking tests
    pub name_prefixes: Option<Vec<String>>,
}

/// `[serve]` table: HTTP boundary address
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Configuration options loaded from config files
///
/// # Example
///
/// ```toml
/// # ~/.config/testradar/config.toml or .testradar.toml
/// graph = "graph.db"        # SQLite database or *.json snapshot
/// max_concurrency = 8       # Parallel graph queries per request
/// query_timeout_ms = 5000   # Per-query bound
/// reason_cap = 5            # Reasons kept per impacted test
/// structural = true         # Structural classifier stage
///
/// [tests]
/// extra_globs = ["qa/**/*.py"]
/// name_prefixes = ["test_", "Test"]
///
/// [serve]
/// bind = "127.0.0.1"
/// port = 8886
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: Option<PathBuf>,
    pub max_concurrency: Option<usize>,
    pub query_timeout_ms: Option<u64>,
    pub reason_cap: Option<usize>,
    pub max_files_per_request: Option<usize>,
    pub max_diff_bytes: Option<usize>,
    pub structural: Option<bool>,
    pub tests: TestsConfig,
    pub serve: ServeConfig,
}

impl Config {
    /// Load configuration from user and project config files
    pub fn load(project_root: &Path) -> Self {
        let user_config = dirs::config_dir()
            .map(|d| d.join("testradar/config.toml"))
            .and_then(|p| Self::load_file(&p))
            .unwrap_or_default();

        let project_config =
            Self::load_file(&project_root.join(".testradar.toml")).unwrap_or_default();

        // Project overrides user
        let merged = user_config.override_with(project_config);
        tracing::debug!(
            graph = ?merged.graph,
            max_concurrency = merged.max_concurrency_or_default(),
            query_timeout_ms = merged.query_timeout_ms_or_default(),
            reason_cap = merged.reason_cap_or_default(),
            structural = merged.structural_or_default(),
            extra_globs = merged.tests.extra_globs.len(),
            "Effective config after merge"
        );
        merged
    }

    /// Load configuration from a specific file
    fn load_file(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(mut config) => {
                // Relative graph paths are relative to the config file
                if let (Some(graph), Some(dir)) = (config.graph.as_mut(), path.parent()) {
                    if graph.is_relative() {
                        *graph = dir.join(&*graph);
                    }
                }
                tracing::debug!(path = %path.display(), graph = ?config.graph, "Loaded config");
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Layer another config on top (other overrides self where present)
    fn override_with(self, other: Self) -> Self {
        // Globs accumulate; prefixes replace
        let mut extra_globs = self.tests.extra_globs;
        for glob in other.tests.extra_globs {
            if !extra_globs.contains(&glob) {
                extra_globs.push(glob);
            }
        }

        Config {
            graph: other.graph.or(self.graph),
            max_concurrency: other.max_concurrency.or(self.max_concurrency),
            query_timeout_ms: other.query_timeout_ms.or(self.query_timeout_ms),
            reason_cap: other.reason_cap.or(self.reason_cap),
            max_files_per_request: other.max_files_per_request.or(self.max_files_per_request),
            max_diff_bytes: other.max_diff_bytes.or(self.max_diff_bytes),
            structural: other.structural.or(self.structural),
            tests: TestsConfig {
                extra_globs,
                name_prefixes: other.tests.name_prefixes.or(self.tests.name_prefixes),
            },
            serve: ServeConfig {
                bind: other.serve.bind.or(self.serve.bind),
                port: other.serve.port.or(self.serve.port),
            },
        }
    }

    // ===== Accessors with defaults =====

    pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
    pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5000;
    pub const DEFAULT_REASON_CAP: usize = 5;
    pub const DEFAULT_MAX_FILES_PER_REQUEST: usize = 50;
    /// 1 MiB
    pub const DEFAULT_MAX_DIFF_BYTES: usize = 1024 * 1024;
    pub const DEFAULT_BIND: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8886;

    /// Fan-out limit for graph queries (at least 1)
    pub fn max_concurrency_or_default(&self) -> usize {
        self.max_concurrency
            .unwrap_or(Self::DEFAULT_MAX_CONCURRENCY)
            .max(1)
    }

    pub fn query_timeout_ms_or_default(&self) -> u64 {
        self.query_timeout_ms
            .unwrap_or(Self::DEFAULT_QUERY_TIMEOUT_MS)
    }

    /// Reasons kept per impacted test (at least 1)
    pub fn reason_cap_or_default(&self) -> usize {
        self.reason_cap.unwrap_or(Self::DEFAULT_REASON_CAP).max(1)
    }

    pub fn max_files_per_request_or_default(&self) -> usize {
        self.max_files_per_request
            .unwrap_or(Self::DEFAULT_MAX_FILES_PER_REQUEST)
    }

    pub fn max_diff_bytes_or_default(&self) -> usize {
        self.max_diff_bytes.unwrap_or(Self::DEFAULT_MAX_DIFF_BYTES)
    }

    pub fn structural_or_default(&self) -> bool {
        self.structural.unwrap_or(true)
    }

    pub fn name_prefixes_or_default(&self) -> Vec<String> {
        self.tests
            .name_prefixes
            .clone()
            .unwrap_or_else(|| vec!["test_".to_string(), "Test".to_string()])
    }

    pub fn bind_or_default(&self) -> &str {
        self.serve.bind.as_deref().unwrap_or(Self::DEFAULT_BIND)
    }

    pub fn port_or_default(&self) -> u16 {
        self.serve.port.unwrap_or(Self::DEFAULT_PORT)
    }

    // ===== Derived settings =====

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            max_concurrency: self.max_concurrency_or_default(),
            query_timeout: std::time::Duration::from_millis(self.query_timeout_ms_or_default()),
            reason_cap: self.reason_cap_or_default(),
            structural: self.structural_or_default(),
        }
    }

    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            max_files: self.max_files_per_request_or_default(),
            max_diff_bytes: self.max_diff_bytes_or_default(),
        }
    }

    pub fn test_convention(&self) -> DefaultTestConvention {
        DefaultTestConvention::new(&self.name_prefixes_or_default(), &self.tests.extra_globs)
    }
}
