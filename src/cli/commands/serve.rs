//! Serve command: HTTP boundary for impact analysis

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use testradar::config::Config;
use testradar::serve::{is_localhost, serve_http, AppState};
use testradar::ImpactAnalyzer;

use crate::cli::config::resolve_graph;

pub(crate) struct ServeArgs {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub graph: Option<PathBuf>,
    pub dangerously_allow_network_bind: bool,
}

pub(crate) fn cmd_serve(args: ServeArgs, config: &Config) -> Result<()> {
    let bind = args
        .bind
        .unwrap_or_else(|| config.bind_or_default().to_string());
    let port = args.port.unwrap_or_else(|| config.port_or_default());

    // Block non-localhost bind unless explicitly allowed
    if !is_localhost(&bind) && !args.dangerously_allow_network_bind {
        bail!(
            "Binding to '{}' would expose the analysis service to the network.\n\
             If this is intentional, add --dangerously-allow-network-bind",
            bind
        );
    }

    let graph_path = resolve_graph(args.graph.as_deref(), config)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let port_impl = testradar::graph::open(&graph_path)
            .await
            .with_context(|| format!("Failed to open graph {}", graph_path.display()))?;
        let state = Arc::new(AppState {
            analyzer: ImpactAnalyzer::new(
                port_impl,
                Arc::new(config.test_convention()),
                config.analyzer_options(),
            ),
            limits: config.request_limits(),
        });
        serve_http(state, &bind, port).await?;
        Ok::<_, anyhow::Error>(())
    })
}
