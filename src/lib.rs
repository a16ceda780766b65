//! # testradar - Test Impact Analysis
//!
//! Turns a code change into a ranked, explained list of the tests it can
//! break, with an overall severity and a suggested action.
//!
//! ## Pipeline
//!
//! - **Diff parsing**: unified diff into files, hunks and changed definitions
//! - **Classification**: heuristic line categories, then a tree-sitter
//!   structural comparison when the heuristics cannot decide
//! - **Graph traversal**: reverse call graph, two hops, through a pluggable
//!   [`DependencyQueryPort`] (in-memory snapshot or SQLite)
//! - **Ranking**: fixed confidence tiers, merged per test path
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use testradar::{
//!     AnalyzerOptions, ChangeKind, ChangeSet, DefaultTestConvention, FileChange,
//!     ImpactAnalyzer, InMemoryGraph,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = InMemoryGraph::new();
//! let callee = graph.add_function("default", "charge", "app/billing.py");
//! let test = graph.add_function("default", "test_charge", "tests/test_billing.py");
//! graph.add_call("default", &test, &callee)?;
//!
//! let analyzer = ImpactAnalyzer::new(
//!     Arc::new(graph),
//!     Arc::new(DefaultTestConvention::default()),
//!     AnalyzerOptions::default(),
//! );
//! let diff = "\
//! diff --git a/app/billing.py b/app/billing.py
//! --- a/app/billing.py
//! +++ b/app/billing.py
//! @@ -1,2 +1,2 @@
//! -def charge(amount):
//! +def charge(amount, currency):
//!      return amount
//! ";
//! let change_set = ChangeSet::new(
//!     "default",
//!     vec![FileChange::new("app/billing.py", ChangeKind::Modified)],
//! )
//! .with_diff(diff);
//!
//! let report = analyzer
//!     .analyze(&change_set, &[], &CancellationToken::new())
//!     .await?;
//! assert_eq!(report.impacted_tests[0].test_path, "tests/test_billing.py");
//! assert_eq!(report.impacted_tests[0].impact_score, 0.9);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod convention;
pub mod diff_parse;
pub mod graph;
pub mod impact;
pub mod language;
pub mod request;
pub mod structural;

#[cfg(feature = "serve")]
pub mod serve;

pub use classify::{ChangeClassifier, Classified};
pub use convention::{DefaultTestConvention, TestConvention};
pub use diff_parse::{extract_changed_functions, parse_unified_diff, FunctionSignature};
pub use graph::{
    DependencyQueryPort, DependencySymbol, GraphError, InMemoryGraph, ReverseDependencies,
    SqliteGraph,
};
pub use impact::{
    format_function_changes, format_report, report_to_mermaid, AnalysisError, AnalyzerOptions,
    ChangeKind, ChangeSet, Classification, FileChange, FunctionChange, ImpactAnalyzer, ImpactItem,
    ImpactReport, ImpactTier, Severity, SuggestedAction,
};
pub use language::Language;
