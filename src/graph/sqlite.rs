//! Read-only SQLite graph adapter

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::translate::symbol_from_row;
use super::{DependencyQueryPort, GraphError, ReverseDependencies};

/// Tables the adapter reads. The ingestion side owns them; this crate only
/// queries.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS symbols (
    id INTEGER PRIMARY KEY,
    project_id TEXT NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'function'
);
CREATE INDEX IF NOT EXISTS idx_symbols_project_name ON symbols(project_id, name);
CREATE TABLE IF NOT EXISTS calls (
    project_id TEXT NOT NULL,
    caller_id INTEGER NOT NULL REFERENCES symbols(id),
    callee_id INTEGER NOT NULL REFERENCES symbols(id)
);
CREATE INDEX IF NOT EXISTS idx_calls_callee ON calls(project_id, callee_id);
";

/// Graph served from a SQLite database opened read-only
#[derive(Debug, Clone)]
pub struct SqliteGraph {
    pool: SqlitePool,
}

/// Connection-level failures mean the collaborator is unreachable
fn map_query_error(e: sqlx::Error) -> GraphError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => GraphError::Unavailable(e.to_string()),
        other => GraphError::Database(other),
    }
}

impl SqliteGraph {
    /// Open `path` read-only. A missing file or failed connection is
    /// [`GraphError::Unavailable`].
    pub async fn open(path: &Path) -> Result<Self, GraphError> {
        if !path.exists() {
            return Err(GraphError::Unavailable(format!(
                "graph database not found: {}",
                path.display()
            )));
        }

        // Use SqliteConnectOptions::filename() to avoid URL parsing issues with
        // special characters in paths (spaces, #, ?, %, unicode).
        let connect_opts = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .idle_timeout(Duration::from_secs(300))
            .connect_with(connect_opts)
            .await
            .map_err(|e| GraphError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DependencyQueryPort for SqliteGraph {
    async fn reverse_dependencies(
        &self,
        function_name: &str,
        project_id: &str,
    ) -> Result<ReverseDependencies, GraphError> {
        tracing::debug!(function_name, project_id, "querying callers from graph database");

        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM symbols WHERE project_id = ?1 AND name = ?2)",
        )
        .bind(project_id)
        .bind(function_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_query_error)?;

        if exists == 0 {
            return Ok(ReverseDependencies::not_found());
        }

        let rows = sqlx::query(
            "SELECT DISTINCT c.name, c.qualified_name, c.file_path
             FROM symbols f
             JOIN calls k ON k.callee_id = f.id AND k.project_id = f.project_id
             JOIN symbols c ON c.id = k.caller_id
             WHERE f.project_id = ?1 AND f.name = ?2
             ORDER BY c.file_path, c.qualified_name",
        )
        .bind(project_id)
        .bind(function_name)
        .fetch_all(&self.pool)
        .await
        .map_err(map_query_error)?;

        let callers = rows
            .iter()
            .map(symbol_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReverseDependencies {
            found: true,
            callers,
        })
    }
}
