//! Project root detection and config resolution

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use testradar::config::Config;

/// Find project root by looking for common markers.
///
/// Walks up from the current directory; the first directory holding a
/// `.testradar.toml`, a build file or a `.git` entry wins.
pub(crate) fn find_project_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_project_root_from(&cwd).unwrap_or_else(|| {
        tracing::warn!("No project root found, using current directory");
        cwd
    })
}

fn find_project_root_from(start: &Path) -> Option<PathBuf> {
    // Priority order: first match wins
    let markers = [
        ".testradar.toml",
        "Cargo.toml",
        "package.json",
        "pyproject.toml",
        "setup.py",
        ".git",
    ];
    let mut current = start;
    loop {
        if markers.iter().any(|m| current.join(m).exists()) {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Graph location: CLI flag or env var, then config file
pub(crate) fn resolve_graph(flag: Option<&Path>, config: &Config) -> Result<PathBuf> {
    match flag.map(Path::to_path_buf).or_else(|| config.graph.clone()) {
        Some(path) => Ok(path),
        None => bail!(
            "No dependency graph configured.\n\
             Pass --graph <PATH>, set TESTRADAR_GRAPH, or add `graph = \"...\"` to .testradar.toml"
        ),
    }
}
