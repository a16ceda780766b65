//! End-to-end impact analysis against a recording graph double

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{analyzer_for, file_diff, signature_change_diff, RecordingGraph};
use testradar::graph::InMemoryGraph;
use testradar::impact::MAX_TRAVERSAL_DEPTH;
use testradar::{
    AnalysisError, AnalyzerOptions, ChangeKind, ChangeSet, FileChange, GraphError, ImpactReport,
    Severity, SuggestedAction,
};
use tokio_util::sync::CancellationToken;

const PROJECT: &str = "shop";

/// payment <- test_payment_success; payment <- process_order <- test_checkout_flow
fn shop_graph() -> InMemoryGraph {
    let mut g = InMemoryGraph::new();
    let payment = g.add_function(PROJECT, "process_payment", "payment.py");
    let order = g.add_function(PROJECT, "process_order", "orders.py");
    let direct = g.add_function(PROJECT, "test_payment_success", "tests/test_payment.py");
    let checkout = g.add_function(PROJECT, "test_checkout_flow", "tests/test_checkout.py");
    g.add_call(PROJECT, &direct, &payment).unwrap();
    g.add_call(PROJECT, &order, &payment).unwrap();
    g.add_call(PROJECT, &checkout, &order).unwrap();
    g
}

fn modified(path: &str) -> FileChange {
    FileChange::new(path, ChangeKind::Modified)
}

fn payment_change() -> ChangeSet {
    ChangeSet::new(PROJECT, vec![modified("payment.py")])
        .with_diff(signature_change_diff("payment.py", &["process_payment"]))
}

async fn run(
    graph: &Arc<RecordingGraph>,
    change_set: &ChangeSet,
    related: &[&str],
) -> Result<ImpactReport, AnalysisError> {
    let related: Vec<String> = related.iter().map(|s| s.to_string()).collect();
    analyzer_for(Arc::clone(graph), AnalyzerOptions::default())
        .analyze(change_set, &related, &CancellationToken::new())
        .await
}

fn scores(report: &ImpactReport) -> Vec<(&str, f64)> {
    report
        .impacted_tests
        .iter()
        .map(|i| (i.test_path.as_str(), i.impact_score))
        .collect()
}

// ===== Scenarios =====

#[tokio::test]
async fn test_docstring_only_change_is_informational() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    let diff = file_diff(
        "a.py",
        "@@ -1,2 +1,3 @@\n def foo():\n+    \"\"\"Return one.\"\"\"\n     return 1\n",
    );
    let cs = ChangeSet::new(PROJECT, vec![modified("a.py")]).with_diff(diff);

    let report = run(&graph, &cs, &[]).await.unwrap();

    assert_eq!(report.impacted_tests.len(), 1);
    let item = &report.impacted_tests[0];
    assert_eq!(item.test_path, "a.py");
    assert_eq!(item.impact_score, 0.1);
    assert_eq!(item.severity, Severity::Informational);
    assert_eq!(item.reasons, vec!["non-functional change in foo"]);
    assert_eq!(report.overall_severity, Severity::Low);
    assert_eq!(report.suggested_action, SuggestedAction::NoAction);
    // Non-functional changes never reach the graph
    assert_eq!(graph.query_count(), 0);
}

#[tokio::test]
async fn test_logic_change_below_docstring_reaches_graph() {
    let mut g = InMemoryGraph::new();
    let foo = g.add_function(PROJECT, "foo", "calc.py");
    let test = g.add_function(PROJECT, "test_foo", "tests/test_calc.py");
    g.add_call(PROJECT, &test, &foo).unwrap();
    let graph = Arc::new(RecordingGraph::new(g));
    // Leading context ends on the docstring's closing quotes
    let diff = file_diff(
        "calc.py",
        "@@ -3,4 +3,4 @@ def foo(x):\n \n     Longer description.\n     \"\"\"\n-    return x + 1\n+    return x + 2\n",
    );
    let cs = ChangeSet::new(PROJECT, vec![modified("calc.py")]).with_diff(diff);

    let report = run(&graph, &cs, &[]).await.unwrap();

    assert_eq!(scores(&report), vec![("tests/test_calc.py", 0.9)]);
    assert_eq!(graph.queries(), vec!["foo"]);
    assert_eq!(report.suggested_action, SuggestedAction::RunAffectedTests);
}

#[tokio::test]
async fn test_direct_test_caller_is_high() {
    let mut g = InMemoryGraph::new();
    let payment = g.add_function(PROJECT, "process_payment", "payment.py");
    let direct = g.add_function(PROJECT, "test_payment_success", "tests/test_payment.py");
    g.add_call(PROJECT, &direct, &payment).unwrap();
    let graph = Arc::new(RecordingGraph::new(g));

    let report = run(&graph, &payment_change(), &[]).await.unwrap();

    assert_eq!(scores(&report), vec![("tests/test_payment.py", 0.9)]);
    let item = &report.impacted_tests[0];
    assert_eq!(item.severity, Severity::High);
    assert_eq!(
        item.reasons,
        vec!["test_payment_success calls modified function process_payment"]
    );
    assert_eq!(report.suggested_action, SuggestedAction::RunAffectedTests);
    assert_eq!(report.overall_severity, Severity::Medium);
}

#[tokio::test]
async fn test_transitive_caller_via_one_extra_query() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));

    let report = run(&graph, &payment_change(), &[]).await.unwrap();

    assert_eq!(
        scores(&report),
        vec![("tests/test_payment.py", 0.9), ("tests/test_checkout.py", 0.7)]
    );
    let checkout = &report.impacted_tests[1];
    assert_eq!(checkout.severity, Severity::Medium);
    assert_eq!(
        checkout.reasons,
        vec!["test_checkout_flow calls process_order which calls modified function process_payment"]
    );
    assert_eq!(graph.queries(), vec!["process_payment", "process_order"]);
}

#[tokio::test]
async fn test_directly_modified_test_file_scores_one() {
    let graph = Arc::new(RecordingGraph::new(InMemoryGraph::new()));
    let cs = ChangeSet::new(
        PROJECT,
        vec![modified("src/foo.py"), modified("tests/test_foo.py")],
    );

    let report = run(&graph, &cs, &[]).await.unwrap();

    assert_eq!(scores(&report), vec![("tests/test_foo.py", 1.0)]);
    assert_eq!(report.impacted_tests[0].severity, Severity::High);
    assert_eq!(
        report.impacted_tests[0].reasons,
        vec!["test file was directly modified"]
    );
}

#[tokio::test]
async fn test_unavailable_graph_fails_whole_request() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    graph.fail_all();
    let cs = ChangeSet::new(
        PROJECT,
        vec![modified("payment.py"), modified("tests/test_payment.py")],
    )
    .with_diff(signature_change_diff("payment.py", &["process_payment"]));

    let err = run(&graph, &cs, &["tests/test_cart.py"]).await.unwrap_err();

    match &err {
        AnalysisError::CollaboratorUnavailable { function, source } => {
            assert_eq!(function, "process_payment");
            assert!(matches!(source, GraphError::Unavailable(_)));
        }
        other => panic!("Expected CollaboratorUnavailable, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(err.status_code(), 503);
}

// ===== Properties =====

#[tokio::test]
async fn test_analysis_is_idempotent() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    let cs = ChangeSet::new(
        PROJECT,
        vec![modified("payment.py"), modified("tests/test_checkout.py")],
    )
    .with_diff(signature_change_diff("payment.py", &["process_payment"]));
    let related = ["tests/test_cart.py"];

    let first = run(&graph, &cs, &related).await.unwrap();
    let second = run(&graph, &cs, &related).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_score_tier_invariant() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    let cosmetic = "@@ -20,2 +20,3 @@ def helper():\n     x = 1\n+    # clarify\n     return x\n";
    let diff = format!(
        "{}{}",
        signature_change_diff("payment.py", &["process_payment"]),
        file_diff("util.py", cosmetic)
    );
    let cs = ChangeSet::new(
        PROJECT,
        vec![
            modified("payment.py"),
            modified("util.py"),
            modified("tests/test_misc.py"),
        ],
    )
    .with_diff(diff);

    let report = run(&graph, &cs, &["tests/test_cart.py"]).await.unwrap();

    // Every tier shows up once
    let mut seen: Vec<f64> = report.impacted_tests.iter().map(|i| i.impact_score).collect();
    seen.sort_by(|a, b| b.total_cmp(a));
    assert_eq!(seen, vec![1.0, 0.9, 0.7, 0.3, 0.1]);

    for item in &report.impacted_tests {
        let ok = match item.severity {
            Severity::High => item.impact_score == 0.9 || item.impact_score == 1.0,
            Severity::Medium => item.impact_score == 0.7,
            Severity::Low => item.impact_score == 0.3,
            Severity::Informational => item.impact_score == 0.1,
            Severity::None => false,
        };
        assert!(ok, "tier mismatch: {item:?}");
    }
}

#[tokio::test]
async fn test_direct_edit_dominates_transitive_signal() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    let cs = ChangeSet::new(
        PROJECT,
        vec![modified("payment.py"), modified("tests/test_checkout.py")],
    )
    .with_diff(signature_change_diff("payment.py", &["process_payment"]));

    let report = run(&graph, &cs, &[]).await.unwrap();

    let checkout = report
        .impacted_tests
        .iter()
        .find(|i| i.test_path == "tests/test_checkout.py")
        .unwrap();
    assert_eq!(checkout.impact_score, 1.0);
    assert_eq!(checkout.severity, Severity::High);
    assert_eq!(
        checkout.reasons,
        vec![
            "test file was directly modified",
            "test_checkout_flow calls process_order which calls modified function process_payment",
        ]
    );
    // Unique by path
    let paths: Vec<_> = report.impacted_tests.iter().map(|i| &i.test_path).collect();
    let mut dedup = paths.clone();
    dedup.sort();
    dedup.dedup();
    assert_eq!(paths.len(), dedup.len());
}

#[tokio::test]
async fn test_traversal_stops_after_two_hops() {
    // test_deep -> outer -> inner -> process_payment
    let mut g = InMemoryGraph::new();
    let payment = g.add_function(PROJECT, "process_payment", "payment.py");
    let inner = g.add_function(PROJECT, "inner", "core/inner.py");
    let outer = g.add_function(PROJECT, "outer", "core/outer.py");
    let deep = g.add_function(PROJECT, "test_deep", "tests/test_deep.py");
    g.add_call(PROJECT, &inner, &payment).unwrap();
    g.add_call(PROJECT, &outer, &inner).unwrap();
    g.add_call(PROJECT, &deep, &outer).unwrap();
    let graph = Arc::new(RecordingGraph::new(g));

    let report = run(&graph, &payment_change(), &[]).await.unwrap();

    assert!(report.impacted_tests.is_empty());
    assert_eq!(report.suggested_action, SuggestedAction::NoAction);
    assert_eq!(graph.queries(), vec!["process_payment", "inner"]);
    assert_eq!(graph.queries().len(), usize::from(MAX_TRAVERSAL_DEPTH));
}

#[tokio::test]
async fn test_reasons_never_exceed_two_hops() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    let report = run(&graph, &payment_change(), &[]).await.unwrap();
    for item in &report.impacted_tests {
        for reason in &item.reasons {
            assert!(reason.matches(" calls ").count() <= 2, "{reason}");
        }
    }
}

#[tokio::test]
async fn test_empty_change_set_makes_no_graph_calls() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    let cs = ChangeSet::new(PROJECT, vec![])
        .with_diff(signature_change_diff("payment.py", &["process_payment"]));

    let err = run(&graph, &cs, &["tests/test_payment.py"]).await.unwrap_err();

    assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    assert_eq!(graph.query_count(), 0);
}

// ===== Graph edge cases =====

#[tokio::test]
async fn test_function_missing_from_graph_is_not_an_error() {
    let graph = Arc::new(RecordingGraph::new(InMemoryGraph::new()));
    let report = run(&graph, &payment_change(), &["tests/test_payment.py"])
        .await
        .unwrap();
    assert_eq!(scores(&report), vec![("tests/test_payment.py", 0.3)]);
    assert_eq!(
        report.impacted_tests[0].reasons,
        vec!["related test with no confirmed dependency"]
    );
    assert_eq!(report.overall_severity, Severity::Low);
}

#[tokio::test]
async fn test_related_hint_not_added_when_covered() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    let report = run(&graph, &payment_change(), &["tests/test_payment.py"])
        .await
        .unwrap();
    let payment = &report.impacted_tests[0];
    assert_eq!(payment.test_path, "tests/test_payment.py");
    assert_eq!(payment.impact_score, 0.9);
    assert_eq!(payment.reasons.len(), 1);
}

#[tokio::test]
async fn test_shared_intermediate_queried_once() {
    // helper calls both changed functions; test_api calls helper
    let mut g = InMemoryGraph::new();
    let a = g.add_function(PROJECT, "alpha", "lib.py");
    let b = g.add_function(PROJECT, "beta", "lib.py");
    let helper = g.add_function(PROJECT, "helper", "api.py");
    let test = g.add_function(PROJECT, "test_api", "tests/test_api.py");
    g.add_call(PROJECT, &helper, &a).unwrap();
    g.add_call(PROJECT, &helper, &b).unwrap();
    g.add_call(PROJECT, &test, &helper).unwrap();
    let graph = Arc::new(RecordingGraph::new(g));
    let cs = ChangeSet::new(PROJECT, vec![modified("lib.py")])
        .with_diff(signature_change_diff("lib.py", &["alpha", "beta"]));

    let report = run(&graph, &cs, &[]).await.unwrap();

    let helper_queries = graph.queries().iter().filter(|q| *q == "helper").count();
    assert_eq!(helper_queries, 1);
    assert_eq!(graph.query_count(), 3);
    assert_eq!(scores(&report), vec![("tests/test_api.py", 0.7)]);
    assert_eq!(report.impacted_tests[0].reasons.len(), 2);
}

#[tokio::test]
async fn test_mixed_change_is_traversed() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    let hunk = "@@ -1,2 +1,3 @@ def process_payment(a):\n     total = a\n+    # apply fee\n-    return total\n+    return total + 1\n";
    let cs = ChangeSet::new(PROJECT, vec![modified("payment.py")])
        .with_diff(file_diff("payment.py", hunk));

    let report = run(&graph, &cs, &[]).await.unwrap();

    assert_eq!(graph.queries()[0], "process_payment");
    assert_eq!(report.impacted_tests[0].impact_score, 0.9);
}

// ===== Concurrency and cancellation =====

#[tokio::test]
async fn test_fan_out_is_bounded() {
    let names: Vec<String> = (0..10).map(|i| format!("func_{i}")).collect();
    let mut g = InMemoryGraph::new();
    for name in &names {
        g.add_function(PROJECT, name, "many.py");
    }
    let graph = Arc::new(RecordingGraph::new(g));
    graph.slow(Duration::from_millis(20));
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let cs = ChangeSet::new(PROJECT, vec![modified("many.py")])
        .with_diff(signature_change_diff("many.py", &refs));
    let options = AnalyzerOptions {
        max_concurrency: 3,
        ..AnalyzerOptions::default()
    };

    analyzer_for(Arc::clone(&graph), options)
        .analyze(&cs, &[], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(graph.query_count(), 10);
    assert!(graph.peak_concurrency() <= 3, "peak {}", graph.peak_concurrency());
    assert!(graph.peak_concurrency() > 1, "queries ran sequentially");
}

#[tokio::test]
async fn test_cancellation_abandons_in_flight_queries() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    graph.stall("process_payment");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = analyzer_for(Arc::clone(&graph), AnalyzerOptions::default())
        .analyze(&payment_change(), &[], &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Cancelled));
    assert_eq!(err.status_code(), 499);
    assert_eq!(graph.abandoned(), 1);
}

#[tokio::test]
async fn test_stalled_query_times_out_as_unavailable() {
    let graph = Arc::new(RecordingGraph::new(shop_graph()));
    graph.stall("process_payment");
    let options = AnalyzerOptions {
        query_timeout: Duration::from_millis(30),
        ..AnalyzerOptions::default()
    };

    let err = analyzer_for(Arc::clone(&graph), options)
        .analyze(&payment_change(), &[], &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        AnalysisError::CollaboratorUnavailable { source, .. } => {
            assert!(matches!(source, GraphError::Timeout { after_ms: 30, .. }));
        }
        other => panic!("Expected CollaboratorUnavailable, got {other:?}"),
    }
}
