//! CLI implementation for testradar

mod commands;
mod config;
mod signal;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use commands::{cmd_analyze, cmd_classify, parse_file_arg, AnalyzeArgs, DiffSource};
use config::find_project_root;
use testradar::FileChange;

#[derive(Parser)]
#[command(name = "testradar")]
#[command(about = "Rank the tests a change can break, with reasons")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug info (sets the default log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Report format for `analyze`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
    Mermaid,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a diff and list impacted tests
    Analyze {
        /// Unified diff file (`-` for stdin)
        #[arg(long, conflicts_with_all = ["stdin", "base"])]
        diff: Option<PathBuf>,
        /// Read the diff from stdin
        #[arg(long, conflicts_with = "base")]
        stdin: bool,
        /// Diff against this revision (`git diff <BASE>`)
        #[arg(long)]
        base: Option<String>,
        /// Changed file as PATH[:KIND] (default: derived from the diff)
        #[arg(long = "file", value_parser = parse_file_arg)]
        files: Vec<FileChange>,
        /// Test path related to the change by an outside signal
        #[arg(long = "related-test")]
        related_tests: Vec<String>,
        /// Project identifier in the dependency graph
        #[arg(long, env = "TESTRADAR_PROJECT", default_value = "default")]
        project: String,
        /// Dependency graph (SQLite database or *.json snapshot)
        #[arg(long, env = "TESTRADAR_GRAPH")]
        graph: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Shorthand for `--format json`
        #[arg(long, conflicts_with = "format")]
        json: bool,
    },
    /// Classify changed functions in a diff (no graph access)
    Classify {
        /// Unified diff file (`-` for stdin)
        #[arg(long, conflicts_with = "stdin")]
        diff: Option<PathBuf>,
        /// Read the diff from stdin
        #[arg(long)]
        stdin: bool,
        /// Diff against this revision (`git diff <BASE>`)
        #[arg(long, conflicts_with_all = ["diff", "stdin"])]
        base: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP server
    #[cfg(feature = "serve")]
    Serve {
        /// Bind address
        #[arg(long)]
        bind: Option<String>,
        /// Port
        #[arg(long)]
        port: Option<u16>,
        /// Dependency graph (SQLite database or *.json snapshot)
        #[arg(long, env = "TESTRADAR_GRAPH")]
        graph: Option<PathBuf>,
        /// Required when binding to non-localhost
        #[arg(long, hide = true)]
        dangerously_allow_network_bind: bool,
    },
}

/// Run CLI with pre-parsed arguments (main.rs inspects `--verbose` first)
pub fn run_with(cli: Cli) -> Result<()> {
    // Config files first; CLI flags and env vars override
    let config = testradar::config::Config::load(&find_project_root());

    match cli.command {
        Commands::Analyze {
            ref diff,
            stdin,
            ref base,
            files,
            related_tests,
            project,
            graph,
            format,
            json,
        } => cmd_analyze(
            AnalyzeArgs {
                diff: DiffSource {
                    file: diff.as_deref(),
                    stdin,
                    base: base.as_deref(),
                },
                files,
                related_tests,
                project,
                graph,
                format: if json { OutputFormat::Json } else { format },
            },
            &config,
        ),
        Commands::Classify {
            ref diff,
            stdin,
            ref base,
            json,
        } => cmd_classify(
            DiffSource {
                file: diff.as_deref(),
                stdin,
                base: base.as_deref(),
            },
            json,
            &config,
        ),
        #[cfg(feature = "serve")]
        Commands::Serve {
            bind,
            port,
            graph,
            dangerously_allow_network_bind,
        } => commands::cmd_serve(
            commands::ServeArgs {
                bind,
                port,
                graph,
                dangerously_allow_network_bind,
            },
            &config,
        ),
    }
}
