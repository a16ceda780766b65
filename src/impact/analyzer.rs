//! End-to-end impact analysis over a dependency graph port

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::{
    merge_items, resolve_severity, AnalysisError, ChangeSet, Classification, FunctionChange,
    ImpactItem, ImpactReport, ImpactTier, MAX_TRAVERSAL_DEPTH,
};
use crate::classify::ChangeClassifier;
use crate::convention::TestConvention;
use crate::diff_parse::{changed_functions, parse_unified_diff};
use crate::graph::{DependencyQueryPort, DependencySymbol, GraphError, ReverseDependencies};

/// Tunables for one analyzer
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Graph queries in flight at once, per request
    pub max_concurrency: usize,
    /// Bound on a single graph query
    pub query_timeout: Duration,
    /// Reasons kept per merged item
    pub reason_cap: usize,
    /// Run the structural classifier stage
    pub structural: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            query_timeout: Duration::from_millis(5000),
            reason_cap: 5,
            structural: true,
        }
    }
}

/// Graph answers keyed by function name
type Answers = HashMap<String, ReverseDependencies>;

/// Stateless between requests; share one across concurrent analyses.
pub struct ImpactAnalyzer {
    port: Arc<dyn DependencyQueryPort>,
    convention: Arc<dyn TestConvention>,
    classifier: ChangeClassifier,
    options: AnalyzerOptions,
}

impl ImpactAnalyzer {
    pub fn new(
        port: Arc<dyn DependencyQueryPort>,
        convention: Arc<dyn TestConvention>,
        options: AnalyzerOptions,
    ) -> Self {
        Self {
            port,
            convention,
            classifier: ChangeClassifier::new(options.structural),
            options,
        }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Classified changed functions of the change set's diff (empty without one).
    ///
    /// Every definition the diff parser reports is covered; the classifier
    /// overlay adds removed and context-line functions.
    pub fn changed_functions(&self, change_set: &ChangeSet) -> Vec<FunctionChange> {
        let Some(diff_text) = change_set.diff_text() else {
            return Vec::new();
        };
        let files = parse_unified_diff(diff_text);
        let mut changes = self.classifier.classify_files(&files);
        for sig in changed_functions(&files) {
            let covered = changes
                .iter()
                .any(|c| c.name == sig.name && c.containing_file == sig.file_path);
            if !covered {
                changes.push(FunctionChange {
                    name: sig.name,
                    containing_file: sig.file_path,
                    classification: Classification::Functional,
                    evidence: "definition added or changed".to_string(),
                });
            }
        }
        changes
    }

    /// Analyze one change set.
    ///
    /// Fails with [`AnalysisError::CollaboratorUnavailable`] if any graph
    /// query fails or times out (no partial report), and with
    /// [`AnalysisError::Cancelled`] as soon as `cancel` fires. In-flight
    /// queries are dropped with the request.
    #[tracing::instrument(
        name = "analyze",
        skip_all,
        fields(
            project = change_set.project_id(),
            files = change_set.files().len(),
            functions = tracing::field::Empty,
        )
    )]
    pub async fn analyze(
        &self,
        change_set: &ChangeSet,
        related_tests: &[String],
        cancel: &CancellationToken,
    ) -> Result<ImpactReport, AnalysisError> {
        if change_set.files().is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "files_changed must not be empty".into(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let project_id = change_set.project_id();

        let functions = self.changed_functions(change_set);
        tracing::Span::current().record("functions", functions.len());
        tracing::info!(
            functions = functions.len(),
            related = related_tests.len(),
            "Starting impact analysis"
        );

        let mut items: Vec<ImpactItem> = Vec::new();

        // Non-functional changes: informational marker, no graph query
        let mut functional: Vec<&FunctionChange> = Vec::new();
        for change in &functions {
            if change.classification.is_functional() {
                functional.push(change);
            } else {
                tracing::debug!(function = %change.name, "Non-functional change, skipping graph query");
                items.push(ImpactItem::new(
                    &change.containing_file,
                    ImpactTier::NonFunctional,
                    format!("non-functional change in {}", change.name),
                ));
            }
        }

        // First hop: direct callers of every functional change
        let first_names = unique(functional.iter().map(|c| c.name.as_str()));
        let first = self.fan_out(&first_names, project_id, 1, cancel).await?;

        let mut intermediates: Vec<(&DependencySymbol, &str)> = Vec::new();
        for change in &functional {
            let Some(deps) = first.get(&change.name) else {
                continue;
            };
            for caller in &deps.callers {
                if self.is_test(caller) {
                    items.push(ImpactItem::new(
                        &caller.file_path,
                        ImpactTier::DirectCaller,
                        format!("{} calls modified function {}", caller.name, change.name),
                    ));
                } else {
                    intermediates.push((caller, change.name.as_str()));
                }
            }
        }

        // Second and last hop: one query per distinct non-test caller,
        // reusing first-hop answers for callers that were themselves changed
        let second_names = unique(
            intermediates
                .iter()
                .map(|(caller, _)| caller.name.as_str())
                .filter(|name| !first.contains_key(*name)),
        );
        let second = self
            .fan_out(&second_names, project_id, MAX_TRAVERSAL_DEPTH, cancel)
            .await?;

        for (intermediate, changed) in &intermediates {
            let Some(deps) = second
                .get(&intermediate.name)
                .or_else(|| first.get(&intermediate.name))
            else {
                continue;
            };
            for caller in deps.callers.iter().filter(|c| self.is_test(c)) {
                items.push(ImpactItem::new(
                    &caller.file_path,
                    ImpactTier::TransitiveCaller,
                    format!(
                        "{} calls {} which calls modified function {}",
                        caller.name, intermediate.name, changed
                    ),
                ));
            }
        }

        // Directly edited test files
        for file in change_set.files() {
            if self.convention.is_test_artifact(&file.path, None) {
                items.push(ImpactItem::new(
                    &file.path,
                    ImpactTier::DirectEdit,
                    "test file was directly modified",
                ));
            }
        }

        // Out-of-band hints not already covered
        let covered: HashSet<&str> = items.iter().map(|i| i.test_path.as_str()).collect();
        let hints: Vec<ImpactItem> = unique(related_tests.iter().map(String::as_str))
            .into_iter()
            .filter(|path| !path.is_empty() && !covered.contains(path.as_str()))
            .map(|path| {
                ImpactItem::new(
                    path,
                    ImpactTier::RelatedHint,
                    "related test with no confirmed dependency",
                )
            })
            .collect();
        items.extend(hints);

        let impacted_tests = merge_items(items, self.options.reason_cap);
        let (overall_severity, suggested_action) = resolve_severity(&impacted_tests);
        tracing::info!(
            impacted = impacted_tests.len(),
            severity = %overall_severity,
            action = %suggested_action,
            "Impact analysis completed"
        );

        Ok(ImpactReport {
            impacted_tests,
            overall_severity,
            suggested_action,
        })
    }

    fn is_test(&self, symbol: &DependencySymbol) -> bool {
        self.convention
            .is_test_artifact(&symbol.file_path, Some(&symbol.name))
    }

    /// Query all `names` concurrently, at most `max_concurrency` at a time.
    ///
    /// The first failure aborts the batch; cancellation drops every query
    /// still in flight.
    async fn fan_out(
        &self,
        names: &[String],
        project_id: &str,
        hop: u8,
        cancel: &CancellationToken,
    ) -> Result<Answers, AnalysisError> {
        if names.is_empty() {
            return Ok(Answers::new());
        }
        let semaphore = Semaphore::new(self.options.max_concurrency.max(1));
        let queries = names
            .iter()
            .map(|name| self.query(name, project_id, hop, &semaphore));

        let answers = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(hop, "Analysis cancelled, abandoning in-flight queries");
                return Err(AnalysisError::Cancelled);
            }
            answers = try_join_all(queries) => answers?,
        };

        Ok(names.iter().cloned().zip(answers).collect())
    }

    #[tracing::instrument(
        name = "reverse_dependencies",
        skip_all,
        fields(function = function_name, hop = hop)
    )]
    async fn query(
        &self,
        function_name: &str,
        project_id: &str,
        hop: u8,
        semaphore: &Semaphore,
    ) -> Result<ReverseDependencies, AnalysisError> {
        // The semaphore is never closed
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| AnalysisError::Cancelled)?;

        let timeout = self.options.query_timeout;
        let result = match tokio::time::timeout(
            timeout,
            self.port.reverse_dependencies(function_name, project_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GraphError::Timeout {
                function: function_name.to_string(),
                after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        let deps = result.map_err(|source| {
            tracing::error!(error = %source, "Graph query failed");
            AnalysisError::CollaboratorUnavailable {
                function: function_name.to_string(),
                source,
            }
        })?;

        if deps.found {
            tracing::debug!(callers = deps.callers.len(), "Graph answered");
        } else {
            tracing::debug!("Function not in graph, no graph evidence");
        }
        Ok(deps)
    }
}

/// Distinct values in first-seen order
fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}
