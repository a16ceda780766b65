//! Command implementations and shared input helpers

mod analyze;
mod classify;
#[cfg(feature = "serve")]
mod serve;

pub(crate) use analyze::{cmd_analyze, AnalyzeArgs};
pub(crate) use classify::cmd_classify;
#[cfg(feature = "serve")]
pub(crate) use serve::{cmd_serve, ServeArgs};

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

use testradar::{ChangeKind, FileChange};

/// Where the diff text comes from
#[derive(Debug, Clone, Copy)]
pub(crate) struct DiffSource<'a> {
    /// Diff file; `-` reads stdin
    pub file: Option<&'a Path>,
    pub stdin: bool,
    /// Revision for `git diff <base>`
    pub base: Option<&'a str>,
}

impl DiffSource<'_> {
    pub fn read(&self) -> Result<String> {
        match self.file {
            Some(path) if path == Path::new("-") => read_stdin(),
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read diff {}", path.display())),
            None if self.stdin => read_stdin(),
            None => run_git_diff(self.base),
        }
    }
}

pub(crate) fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read diff from stdin")?;
    Ok(buf)
}

/// `git diff [base]` in the current directory
pub(crate) fn run_git_diff(base: Option<&str>) -> Result<String> {
    let _span = tracing::info_span!("run_git_diff", base = base.unwrap_or("")).entered();

    let mut cmd = std::process::Command::new("git");
    cmd.args(["--no-pager", "diff", "--no-color", "--no-ext-diff"]);
    if let Some(base) = base {
        if base.starts_with('-') {
            bail!("Invalid base '{}': must not start with '-'", base);
        }
        cmd.arg(base);
    }
    let output = cmd
        .output()
        .context("Failed to run 'git diff'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.contains("not a git repository") {
            bail!("Not a git repository; pass --diff <FILE> or --stdin");
        }
        bail!("git diff failed: {}", stderr);
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parse `PATH[:KIND]`; a suffix that is not a change kind stays part of the path.
pub(crate) fn parse_file_arg(arg: &str) -> Result<FileChange, String> {
    if arg.trim().is_empty() {
        return Err("file path must not be empty".to_string());
    }
    if let Some((path, kind)) = arg.rsplit_once(':') {
        if let Ok(kind) = kind.parse::<ChangeKind>() {
            if path.is_empty() {
                return Err(format!("missing path in '{arg}'"));
            }
            return Ok(FileChange::new(path, kind));
        }
    }
    Ok(FileChange::new(arg, ChangeKind::Modified))
}
