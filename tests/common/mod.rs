//! Common test fixtures and helpers
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::RecordingGraph;
//! ```
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use testradar::graph::{DependencyQueryPort, GraphError, InMemoryGraph, ReverseDependencies};
use testradar::{AnalyzerOptions, DefaultTestConvention, ImpactAnalyzer};

/// Port double over an [`InMemoryGraph`].
///
/// Records every query, tracks peak concurrency, and can be switched to
/// fail, stall or answer slowly.
pub struct RecordingGraph {
    inner: InMemoryGraph,
    queries: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    unavailable: AtomicBool,
    /// Names that never answer
    stall_on: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    /// Set once a stalled query is dropped
    abandoned: Arc<AtomicUsize>,
}

impl RecordingGraph {
    pub fn new(inner: InMemoryGraph) -> Self {
        Self {
            inner,
            queries: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            stall_on: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            abandoned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every query fails with [`GraphError::Unavailable`]
    pub fn fail_all(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    /// Queries for `name` never complete
    pub fn stall(&self, name: &str) {
        self.stall_on.lock().unwrap().push(name.to_string());
    }

    /// Every query sleeps before answering
    pub fn slow(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

/// Decrements in-flight on drop; counts abandonment if not finished
struct InFlight<'a> {
    graph: &'a RecordingGraph,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.graph.in_flight.fetch_sub(1, Ordering::SeqCst);
        if !self.finished {
            self.graph.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl DependencyQueryPort for RecordingGraph {
    async fn reverse_dependencies(
        &self,
        function_name: &str,
        project_id: &str,
    ) -> Result<ReverseDependencies, GraphError> {
        self.queries.lock().unwrap().push(function_name.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let mut guard = InFlight {
            graph: self,
            finished: false,
        };

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let stalled = self
            .stall_on
            .lock()
            .unwrap()
            .iter()
            .any(|n| n == function_name);
        if stalled {
            std::future::pending::<()>().await;
        }

        let result = if self.unavailable.load(Ordering::SeqCst) {
            Err(GraphError::Unavailable("connection refused".into()))
        } else {
            self.inner
                .reverse_dependencies(function_name, project_id)
                .await
        };
        guard.finished = true;
        result
    }
}

/// Analyzer over `graph` with the default test convention
pub fn analyzer_for(graph: Arc<RecordingGraph>, options: AnalyzerOptions) -> ImpactAnalyzer {
    ImpactAnalyzer::new(graph, Arc::new(DefaultTestConvention::default()), options)
}

/// Unified diff for one file with a single hunk
pub fn file_diff(path: &str, hunk: &str) -> String {
    format!("diff --git a/{path} b/{path}\n--- a/{path}\n+++ b/{path}\n{hunk}")
}

/// Diff whose hunk rewrites the signature of each named Python function
pub fn signature_change_diff(path: &str, names: &[&str]) -> String {
    let mut out = format!("diff --git a/{path} b/{path}\n--- a/{path}\n+++ b/{path}\n");
    for (i, name) in names.iter().enumerate() {
        let start = i * 10 + 1;
        out.push_str(&format!(
            "@@ -{start},2 +{start},2 @@\n-def {name}(a):\n+def {name}(a, b):\n     return a\n"
        ));
    }
    out
}
