//! Impact analysis core
//!
//! Turns a change set into a ranked, explained list of impacted tests:
//! classify changed functions, walk the reverse call graph two hops deep,
//! merge evidence per test path and resolve an overall severity.

mod analyzer;
mod format;
mod merge;
mod severity;
mod types;

pub use analyzer::{AnalyzerOptions, ImpactAnalyzer};
pub use format::{format_function_changes, format_report, report_to_mermaid};
pub use merge::merge_items;
pub use severity::resolve_severity;
pub use types::{
    ChangeKind, ChangeSet, Classification, FileChange, FunctionChange, ImpactItem, ImpactReport,
    ImpactTier, Severity, SuggestedAction,
};

use crate::graph::GraphError;

/// Maximum call-chain length the analyzer follows (test -> intermediate -> changed)
pub const MAX_TRAVERSAL_DEPTH: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Empty or malformed change set; never reaches the graph
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The graph could not answer; the whole request fails
    #[error("dependency graph unavailable while querying '{function}': {source}")]
    CollaboratorUnavailable {
        function: String,
        #[source]
        source: GraphError,
    },
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Only collaborator unavailability is worth retrying later
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::CollaboratorUnavailable { .. })
    }

    /// HTTP status for the boundary (499 = client closed request)
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisError::InvalidRequest(_) => 400,
            AnalysisError::CollaboratorUnavailable { .. } => 503,
            AnalysisError::Cancelled => 499,
        }
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            AnalysisError::InvalidRequest(_) => "invalid_request",
            AnalysisError::CollaboratorUnavailable { .. } => "collaborator_unavailable",
            AnalysisError::Cancelled => "cancelled",
        }
    }
}
