//! Unified diff parser
//!
//! Turns `git diff` output into typed per-file hunks, extracts the function
//! definitions an edit introduces, and derives the changed-file list from
//! the diff headers.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::impact::{ChangeKind, FileChange};
use crate::language::Language;

/// Compiled once, reused across all calls to `parse_unified_diff`
static HUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$").expect("hardcoded hunk regex")
});

/// Kind of a single line inside a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

/// One body line of a hunk, without its `+`/`-`/` ` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

impl DiffLine {
    pub fn is_change(&self) -> bool {
        self.kind != LineKind::Context
    }
}

/// A single hunk from a unified diff, one changed region in one file
#[derive(Debug, Clone, Default)]
pub struct DiffHunk {
    /// Start line in the old version (1-based, 0 for an empty side)
    pub old_start: u32,
    pub old_count: u32,
    /// Start line in the new version (1-based, 0 for an empty side)
    pub new_start: u32,
    pub new_count: u32,
    /// Section heading git prints after the second `@@` (often the enclosing function)
    pub section: Option<String>,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// True if the hunk adds or removes at least one line
    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(DiffLine::is_change)
    }
}

/// All hunks for one file, plus what the headers say about the file
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Path on the old side (`--- a/...`), `None` for a new file
    pub old_path: Option<String>,
    /// Path on the new side (`+++ b/...`), `None` for a deleted file
    pub new_path: Option<String>,
    pub kind: ChangeKind,
    pub binary: bool,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    fn new() -> Self {
        Self {
            old_path: None,
            new_path: None,
            kind: ChangeKind::Modified,
            binary: false,
            hunks: Vec::new(),
        }
    }

    /// The path this change is reported under: new side, or old side for deletions
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or_default()
    }

    /// Language of the file, if its extension maps to an enabled language
    pub fn language(&self) -> Option<Language> {
        Language::from_path(self.path())
    }

    fn is_empty(&self) -> bool {
        self.old_path.is_none() && self.new_path.is_none() && self.hunks.is_empty()
    }
}

/// A changed function definition: `(name, file)` is the identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FunctionSignature {
    pub name: String,
    pub file_path: String,
}

/// Strip git's `a/` / `b/` prefix; `/dev/null` means "no file on this side".
fn header_path(raw: &str, prefix: &str) -> Option<String> {
    // git appends a tab + timestamp in some modes (`diff -u` style headers)
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix(prefix).unwrap_or(raw).to_string())
}

/// Parse a hunk count, defaulting to 1 when omitted (`@@ -3 +3 @@`)
fn parse_count(m: Option<regex::Match<'_>>, line: &str) -> u32 {
    match m {
        None => 1,
        Some(m) => m.as_str().parse().unwrap_or_else(|_| {
            tracing::warn!(line, "Could not parse hunk count, defaulting to 1");
            1
        }),
    }
}

fn parse_start(m: Option<regex::Match<'_>>, line: &str) -> u32 {
    m.and_then(|m| m.as_str().parse().ok()).unwrap_or_else(|| {
        tracing::warn!(line, "Could not parse hunk start line number, defaulting to 1");
        1
    })
}

fn flush_hunk(current: &mut FileDiff, hunk: &mut Option<DiffHunk>) {
    if let Some(h) = hunk.take() {
        current.hunks.push(h);
    }
}

/// Parse unified diff output into per-file hunks.
///
/// Handles standard `git diff` output as well as plain `diff -u`:
/// - Splits on `diff --git` boundaries (or on `---` outside a hunk)
/// - Reads `new file mode` / `deleted file mode` / `rename from|to` headers
/// - Tracks remaining hunk line counts so body lines starting with `---`
///   or `+++` are not mistaken for file headers
/// - Skips `\ No newline at end of file` markers
/// - Marks binary files and keeps them without hunks
pub fn parse_unified_diff(input: &str) -> Vec<FileDiff> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    // Normalize CRLF for Windows git output (bare \r from classic Mac too)
    let input = if input.contains('\r') {
        Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(input)
    };

    let mut files: Vec<FileDiff> = Vec::new();
    let mut current = FileDiff::new();
    let mut hunk: Option<DiffHunk> = None;
    // Lines still expected on each side of the open hunk
    let mut old_left = 0u32;
    let mut new_left = 0u32;

    for line in input.lines() {
        if hunk.is_some() && (old_left > 0 || new_left > 0) {
            let parsed = match line.chars().next() {
                Some('+') => Some((LineKind::Added, &line[1..])),
                Some('-') => Some((LineKind::Removed, &line[1..])),
                Some(' ') => Some((LineKind::Context, &line[1..])),
                Some('\\') => continue,
                // Some tools emit an empty line for a blank context line
                None => Some((LineKind::Context, "")),
                Some(_) => None,
            };
            match parsed {
                Some((kind, text)) => {
                    match kind {
                        LineKind::Added => new_left = new_left.saturating_sub(1),
                        LineKind::Removed => old_left = old_left.saturating_sub(1),
                        LineKind::Context => {
                            old_left = old_left.saturating_sub(1);
                            new_left = new_left.saturating_sub(1);
                        }
                    }
                    if let Some(h) = hunk.as_mut() {
                        h.lines.push(DiffLine {
                            kind,
                            text: text.to_string(),
                        });
                    }
                    continue;
                }
                None => {
                    tracing::warn!(
                        file = current.path(),
                        "Hunk ended before its declared line count"
                    );
                    old_left = 0;
                    new_left = 0;
                    flush_hunk(&mut current, &mut hunk);
                }
            }
        }

        if line.starts_with('\\') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            flush_hunk(&mut current, &mut hunk);
            if !current.is_empty() {
                files.push(std::mem::replace(&mut current, FileDiff::new()));
            }
            // Fallback paths for headerless entries (mode changes, binaries)
            if let Some((a, b)) = rest.split_once(" b/") {
                current.old_path = header_path(a, "a/");
                current.new_path = Some(b.to_string());
            }
            continue;
        }

        if line.starts_with("new file mode") {
            current.kind = ChangeKind::Added;
            current.old_path = None;
            continue;
        }
        if line.starts_with("deleted file mode") {
            current.kind = ChangeKind::Removed;
            current.new_path = None;
            continue;
        }
        if let Some(p) = line.strip_prefix("rename from ") {
            current.old_path = Some(p.to_string());
            continue;
        }
        if let Some(p) = line.strip_prefix("rename to ") {
            current.new_path = Some(p.to_string());
            continue;
        }
        if line.starts_with("Binary files ") || line == "GIT binary patch" {
            current.binary = true;
            continue;
        }

        if let Some(raw) = line.strip_prefix("--- ") {
            flush_hunk(&mut current, &mut hunk);
            // Plain `diff -u` output has no `diff --git` separator
            if !current.hunks.is_empty() {
                files.push(std::mem::replace(&mut current, FileDiff::new()));
            }
            current.old_path = header_path(raw, "a/");
            if current.old_path.is_none() {
                current.kind = ChangeKind::Added;
            }
            continue;
        }
        if let Some(raw) = line.strip_prefix("+++ ") {
            current.new_path = header_path(raw, "b/");
            if current.new_path.is_none() {
                // Deleted file
                current.kind = ChangeKind::Removed;
            }
            continue;
        }

        if let Some(caps) = HUNK_RE.captures(line) {
            flush_hunk(&mut current, &mut hunk);
            let old_start = parse_start(caps.get(1), line);
            let old_count = parse_count(caps.get(2), line);
            let new_start = parse_start(caps.get(3), line);
            let new_count = parse_count(caps.get(4), line);
            let section = caps
                .get(5)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            old_left = old_count;
            new_left = new_count;
            hunk = Some(DiffHunk {
                old_start,
                old_count,
                new_start,
                new_count,
                section,
                lines: Vec::new(),
            });
            continue;
        }

        if line.starts_with("@@") {
            tracing::warn!(line, "Malformed hunk header, skipping hunk");
            flush_hunk(&mut current, &mut hunk);
        }
    }

    flush_hunk(&mut current, &mut hunk);
    if !current.is_empty() {
        files.push(current);
    }

    files
}

/// Function definitions an edit introduces.
///
/// Only added lines are scanned. A definition counts when its own line is
/// added, or when an added decorator/attribute line sits directly above it
/// (with only further decorator lines in between). Files whose extension
/// maps to no enabled language are skipped. Deduplicated by `(file, name)`,
/// in diff order.
pub fn changed_functions(files: &[FileDiff]) -> Vec<FunctionSignature> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for file in files {
        if file.binary || file.new_path.is_none() {
            continue;
        }
        let Some(lang) = file.language() else {
            continue;
        };
        let def = lang.def();
        let path = file.path();

        for hunk in &file.hunks {
            // Old-side lines are not part of the new text
            let new_side: Vec<&DiffLine> = hunk
                .lines
                .iter()
                .filter(|l| l.kind != LineKind::Removed)
                .collect();

            for (i, line) in new_side.iter().enumerate() {
                if line.kind != LineKind::Added {
                    continue;
                }
                let name = if def.is_decorator(&line.text) {
                    new_side[i + 1..]
                        .iter()
                        .find(|l| !def.is_decorator(&l.text))
                        .and_then(|l| def.match_definition(&l.text))
                } else {
                    def.match_definition(&line.text)
                };
                if let Some(name) = name {
                    if seen.insert((path.to_string(), name.to_string())) {
                        out.push(FunctionSignature {
                            name: name.to_string(),
                            file_path: path.to_string(),
                        });
                    }
                }
            }
        }
    }

    out
}

/// Parse `diff_text` and extract changed function signatures.
///
/// Absent or definition-free diff text yields an empty list: no
/// function-level signal, not an error.
pub fn extract_changed_functions(diff_text: &str) -> Vec<FunctionSignature> {
    changed_functions(&parse_unified_diff(diff_text))
}

/// Derive the changed-file list from diff headers.
///
/// `new file mode` gives added, `deleted file mode` or `+++ /dev/null`
/// gives removed, anything else modified. Renames report the new path.
pub fn changed_files(files: &[FileDiff]) -> Vec<FileChange> {
    let mut seen = HashSet::new();
    files
        .iter()
        .filter(|f| !f.path().is_empty())
        .filter(|f| seen.insert(f.path().to_string()))
        .map(|f| FileChange {
            path: f.path().to_string(),
            change_kind: f.kind,
        })
        .collect()
}
