//! Dependency graph port and adapters
//!
//! The analyzer only ever asks one question of the graph collaborator:
//! "who calls function X in project P". [`DependencyQueryPort`] is that
//! question; [`InMemoryGraph`] and [`SqliteGraph`] answer it from a JSON
//! snapshot or a SQLite database. All collaborator-native data is turned
//! into typed values in [`translate`] and nowhere else.

mod memory;
mod sqlite;
pub mod translate;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryGraph;
pub use sqlite::{SqliteGraph, SCHEMA};

/// A symbol as the graph collaborator reports it. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencySymbol {
    pub name: String,
    pub qualified_name: String,
    pub file_path: String,
}

/// Answer to a reverse-dependency query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseDependencies {
    /// False when the function has no node in the graph (not an error)
    pub found: bool,
    pub callers: Vec<DependencySymbol>,
}

impl ReverseDependencies {
    pub fn not_found() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("graph query for '{function}' timed out after {after_ms}ms")]
    Timeout { function: String, after_ms: u64 },
    #[error("graph database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid graph snapshot: {0}")]
    Snapshot(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reverse-dependency query consumed by the analyzer.
///
/// Implementations must not mutate the graph. Latency is bounded by the
/// caller (see `query_timeout_ms`), not by the port.
#[async_trait]
pub trait DependencyQueryPort: Send + Sync {
    async fn reverse_dependencies(
        &self,
        function_name: &str,
        project_id: &str,
    ) -> Result<ReverseDependencies, GraphError>;
}

/// Open the graph at `path`: `*.json` is a snapshot, anything else SQLite.
pub async fn open(path: &Path) -> Result<Arc<dyn DependencyQueryPort>, GraphError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        tracing::debug!(path = %path.display(), "Loading graph snapshot");
        Ok(Arc::new(InMemoryGraph::load(path)?))
    } else {
        tracing::debug!(path = %path.display(), "Opening graph database");
        Ok(Arc::new(SqliteGraph::open(path).await?))
    }
}
