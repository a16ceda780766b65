//! Analyze command: diff in, ranked impacted tests out

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use testradar::config::Config;
use testradar::diff_parse::{changed_files, parse_unified_diff};
use testradar::request::{ErrorBody, ImpactRequest};
use testradar::{format_report, report_to_mermaid, AnalysisError, FileChange, ImpactAnalyzer};

use super::DiffSource;
use crate::cli::config::resolve_graph;
use crate::cli::signal::{cancel_on_ctrl_c, ExitCode};
use crate::cli::OutputFormat;

pub(crate) struct AnalyzeArgs<'a> {
    pub diff: DiffSource<'a>,
    pub files: Vec<FileChange>,
    pub related_tests: Vec<String>,
    pub project: String,
    pub graph: Option<PathBuf>,
    pub format: OutputFormat,
}

pub(crate) fn cmd_analyze(args: AnalyzeArgs<'_>, config: &Config) -> Result<()> {
    let _span =
        tracing::info_span!("cmd_analyze", project = %args.project, format = ?args.format).entered();
    let json = args.format == OutputFormat::Json;

    let diff_text = args.diff.read()?;
    // Without explicit files, the diff headers decide
    let files_changed = if args.files.is_empty() {
        changed_files(&parse_unified_diff(&diff_text))
    } else {
        args.files
    };
    let request = ImpactRequest {
        files_changed,
        related_tests: args.related_tests,
        diff_text: Some(diff_text),
        project_id: args.project,
    };

    let (change_set, related_tests) = match request.into_change_set(&config.request_limits()) {
        Ok(parts) => parts,
        Err(err) => fail(&err, json),
    };

    let graph_path = resolve_graph(args.graph.as_deref(), config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let port = match rt.block_on(testradar::graph::open(&graph_path)) {
        Ok(port) => port,
        Err(e) => {
            tracing::error!(error = %e, graph = %graph_path.display(), "Failed to open graph");
            eprintln!("Error: cannot open dependency graph {}: {e}", graph_path.display());
            std::process::exit(ExitCode::Unavailable as i32)
        }
    };
    let analyzer = ImpactAnalyzer::new(
        port,
        Arc::new(config.test_convention()),
        config.analyzer_options(),
    );

    let outcome = rt.block_on(async {
        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(&cancel);
        let result = analyzer.analyze(&change_set, &related_tests, &cancel).await;
        // Stops the Ctrl+C listener
        cancel.cancel();
        result
    });

    match outcome {
        Ok(report) => {
            match args.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Mermaid => println!("{}", report_to_mermaid(&report)),
                OutputFormat::Text => println!("{}", format_report(&report)),
            }
            Ok(())
        }
        Err(err) => fail(&err, json),
    }
}

/// Report an analysis failure and exit with its code
fn fail(err: &AnalysisError, json: bool) -> ! {
    tracing::error!(error = %err, code = err.error_code(), "Analysis failed");
    if json {
        match serde_json::to_string_pretty(&ErrorBody::from(err)) {
            Ok(body) => println!("{body}"),
            Err(_) => eprintln!("Error: {err}"),
        }
    } else {
        eprintln!("Error: {err}");
        if err.is_retryable() {
            eprintln!("The dependency graph could not answer; try again later.");
        }
    }
    std::process::exit(ExitCode::from(err) as i32)
}
