//! Change classification: functional, non-functional or mixed
//!
//! Classification runs in two stages with a single entry point
//! ([`ChangeClassifier::classify_lines`]):
//!
//! 1. The heuristic stage labels every changed line (blank, comment, doc
//!    content, import, code). If no line is code it returns
//!    [`HeuristicVerdict::Decided`] and the second stage never runs.
//! 2. Otherwise it returns [`HeuristicVerdict::NeedsDeeperAnalysis`] and the
//!    structural stage compares old and new syntax (see [`crate::structural`]).
//!    Anything it cannot decide resolves to functional.

use std::collections::HashMap;

use crate::diff_parse::{parse_unified_diff, DiffHunk, DiffLine, FileDiff, LineKind};
use crate::impact::{Classification, FunctionChange};
use crate::language::{Language, LanguageDef};
use crate::structural::{self, StructuralVerdict};

/// What a single changed line is, as far as the heuristic stage can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineCategory {
    Blank,
    Comment,
    Doc,
    Import,
    Code,
}

impl LineCategory {
    fn evidence(self) -> Option<&'static str> {
        match self {
            LineCategory::Comment => Some("comment-only changes"),
            LineCategory::Doc => Some("docstring updates"),
            LineCategory::Blank => Some("whitespace/formatting changes"),
            LineCategory::Import => Some("import statement changes"),
            LineCategory::Code => None,
        }
    }

    /// A non-code category that is a deliberate edit rather than layout noise
    fn is_cosmetic_edit(self) -> bool {
        matches!(
            self,
            LineCategory::Comment | LineCategory::Doc | LineCategory::Import
        )
    }
}

/// Result of the heuristic stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeuristicVerdict {
    Decided(Classification),
    NeedsDeeperAnalysis,
}

/// A classification together with the evidence string behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub classification: Classification,
    pub evidence: String,
}

/// Tracks whether one side of a diff is inside a doc block (docstring or
/// block comment) while walking its lines in order.
///
/// Only a changed line can open a block: the hunk may start inside a block
/// whose opening is not visible, so a delimiter on a context line proves
/// nothing. Delimiters that open and close with the same token (Python
/// `"""`) additionally need a definition line directly above on the same
/// side. Lines the tracker cannot vouch for stay code, which sends the
/// region to the structural stage.
struct DocTracker {
    def: Option<&'static LanguageDef>,
    close: Option<&'static str>,
    /// The previous non-blank line on this side was a definition
    after_definition: bool,
}

impl DocTracker {
    fn new(def: Option<&'static LanguageDef>) -> Self {
        Self {
            def,
            close: None,
            after_definition: false,
        }
    }

    /// Feed the next line on this side; true if the line is doc-block content.
    fn feed(&mut self, line: &str, changed: bool) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return self.close.is_some();
        }
        let in_doc = self.step(trimmed, changed);
        self.after_definition = self
            .def
            .is_some_and(|d| d.match_definition(line).is_some());
        in_doc
    }

    fn step(&mut self, trimmed: &str, changed: bool) -> bool {
        if let Some(close) = self.close {
            return match trimmed.find(close) {
                Some(at) => {
                    self.close = None;
                    trimmed[at + close.len()..].trim().is_empty()
                }
                None => true,
            };
        }
        if !changed {
            return false;
        }
        let delimiters = self.def.map(|d| d.doc_delimiters).unwrap_or(&[]);
        for &(open, close) in delimiters {
            let Some(rest) = trimmed.strip_prefix(open) else {
                continue;
            };
            if open == close && !self.after_definition {
                return false;
            }
            // Code after the closing delimiter makes the whole line code
            return match rest.find(close) {
                Some(at) => rest[at + close.len()..].trim().is_empty(),
                None => {
                    self.close = Some(close);
                    true
                }
            };
        }
        false
    }
}

/// Label every line of a region. Context lines advance both sides' doc
/// state; changed lines only their own side.
pub fn categorize(language: Option<Language>, lines: &[&DiffLine]) -> Vec<LineCategory> {
    let def = language.map(|l| l.def());
    let mut old_doc = DocTracker::new(def);
    let mut new_doc = DocTracker::new(def);

    lines
        .iter()
        .map(|line| {
            let in_doc = match line.kind {
                LineKind::Context => {
                    let a = old_doc.feed(&line.text, false);
                    let b = new_doc.feed(&line.text, false);
                    a || b
                }
                LineKind::Removed => old_doc.feed(&line.text, true),
                LineKind::Added => new_doc.feed(&line.text, true),
            };
            if line.text.trim().is_empty() {
                LineCategory::Blank
            } else if in_doc {
                LineCategory::Doc
            } else if def.is_some_and(|d| d.is_line_comment(&line.text)) {
                LineCategory::Comment
            } else if def.is_some_and(|d| d.is_import(&line.text)) {
                LineCategory::Import
            } else {
                LineCategory::Code
            }
        })
        .collect()
}

/// Join the evidence phrases for the categories present, in a fixed order
fn evidence_for(categories: &[LineCategory]) -> String {
    const ORDER: [LineCategory; 4] = [
        LineCategory::Comment,
        LineCategory::Doc,
        LineCategory::Blank,
        LineCategory::Import,
    ];
    let phrases: Vec<&str> = ORDER
        .iter()
        .filter(|c| categories.contains(c))
        .filter_map(|c| c.evidence())
        .collect();
    if phrases.is_empty() {
        "non-functional changes detected".to_string()
    } else {
        phrases.join("; ")
    }
}

/// Heuristic stage over the changed lines of a region.
pub fn heuristic_stage(changed: &[LineCategory]) -> HeuristicVerdict {
    if changed.iter().all(|c| *c != LineCategory::Code) {
        HeuristicVerdict::Decided(Classification::NonFunctional)
    } else {
        HeuristicVerdict::NeedsDeeperAnalysis
    }
}

/// One function's slice of a hunk
struct Segment<'h> {
    name: Option<String>,
    lines: Vec<&'h DiffLine>,
}

impl Segment<'_> {
    fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.is_change())
    }
}

/// Split a hunk at definition lines (added, removed or context).
///
/// Lines before the first definition belong to the function named in the
/// hunk's section heading, if that heading is a definition. Decorator lines
/// attach to the definition that follows them.
fn segment_hunk<'h>(def: &LanguageDef, hunk: &'h DiffHunk) -> Vec<Segment<'h>> {
    let mut segments = Vec::new();
    let mut current = Segment {
        name: hunk
            .section
            .as_deref()
            .and_then(|s| def.match_definition(s))
            .map(str::to_string),
        lines: Vec::new(),
    };
    let mut pending: Vec<&DiffLine> = Vec::new();

    for line in &hunk.lines {
        if def.is_decorator(&line.text) {
            pending.push(line);
            continue;
        }
        if let Some(name) = def.match_definition(&line.text) {
            if current.name.as_deref() != Some(name) {
                let next = Segment {
                    name: Some(name.to_string()),
                    lines: Vec::new(),
                };
                let done = std::mem::replace(&mut current, next);
                if !done.lines.is_empty() {
                    segments.push(done);
                }
            }
        }
        current.lines.append(&mut pending);
        current.lines.push(line);
    }
    current.lines.append(&mut pending);
    if !current.lines.is_empty() {
        segments.push(current);
    }
    segments
}

/// Two-stage change classifier
#[derive(Debug, Clone, Copy)]
pub struct ChangeClassifier {
    structural: bool,
}

impl Default for ChangeClassifier {
    fn default() -> Self {
        Self { structural: true }
    }
}

impl ChangeClassifier {
    /// `structural = false` skips the second stage: anything the heuristic
    /// stage cannot decide is functional.
    pub fn new(structural: bool) -> Self {
        Self { structural }
    }

    /// Classify one region (a hunk or a function's slice of one).
    pub fn classify_lines(&self, language: Option<Language>, lines: &[&DiffLine]) -> Classified {
        let categories = categorize(language, lines);
        let changed: Vec<LineCategory> = lines
            .iter()
            .zip(&categories)
            .filter(|(l, _)| l.is_change())
            .map(|(_, c)| *c)
            .collect();

        if changed.is_empty() {
            return Classified {
                classification: Classification::NonFunctional,
                evidence: "no changed lines".into(),
            };
        }

        if let HeuristicVerdict::Decided(classification) = heuristic_stage(&changed) {
            return Classified {
                classification,
                evidence: evidence_for(&changed),
            };
        }

        let verdict = match language {
            Some(lang) if self.structural => {
                let (old, new) = reconstruct(lines);
                structural::compare(lang, &old, &new)
            }
            Some(_) => StructuralVerdict::Ambiguous("structural stage disabled".into()),
            None => StructuralVerdict::Ambiguous("no grammar for this file".into()),
        };

        match verdict {
            StructuralVerdict::Equivalent => Classified {
                classification: Classification::NonFunctional,
                evidence: "formatting-only changes (syntax unchanged after normalisation)".into(),
            },
            StructuralVerdict::Differs => {
                let cosmetic: Vec<LineCategory> = changed
                    .iter()
                    .copied()
                    .filter(|c| c.is_cosmetic_edit())
                    .collect();
                if cosmetic.is_empty() {
                    Classified {
                        classification: Classification::Functional,
                        evidence: "structure differs after normalisation".into(),
                    }
                } else {
                    Classified {
                        classification: Classification::Mixed,
                        evidence: format!("logic changes alongside {}", evidence_for(&cosmetic)),
                    }
                }
            }
            StructuralVerdict::Ambiguous(why) => {
                tracing::debug!(reason = %why, "Ambiguous classification, treating as functional");
                Classified {
                    classification: Classification::Functional,
                    evidence: format!("ambiguous change, defaulting to functional ({why})"),
                }
            }
        }
    }

    /// Classify a whole hunk of `file`.
    pub fn classify_hunk(&self, file: &FileDiff, hunk: &DiffHunk) -> Classified {
        let lines: Vec<&DiffLine> = hunk.lines.iter().collect();
        self.classify_lines(file.language(), &lines)
    }

    /// Per-function overlay: one [`FunctionChange`] per function whose slice
    /// of the diff contains changed lines.
    ///
    /// A function changed in several hunks is classified per hunk and the
    /// verdicts combined (any disagreement becomes mixed). Changed lines
    /// outside any detectable function produce nothing here.
    pub fn classify_files(&self, files: &[FileDiff]) -> Vec<FunctionChange> {
        let _span = tracing::info_span!("classify_diff", files = files.len()).entered();

        let mut out: Vec<FunctionChange> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();

        for file in files {
            if file.binary {
                continue;
            }
            let Some(lang) = file.language() else {
                tracing::debug!(file = file.path(), "No language for file, file-level evidence only");
                continue;
            };
            let def = lang.def();

            for hunk in &file.hunks {
                for segment in segment_hunk(def, hunk) {
                    if !segment.has_changes() {
                        continue;
                    }
                    let Some(name) = segment.name else {
                        tracing::debug!(
                            file = file.path(),
                            "Changed lines outside any function, file-level evidence only"
                        );
                        continue;
                    };
                    let classified = self.classify_lines(Some(lang), &segment.lines);
                    tracing::debug!(
                        function = %name,
                        file = file.path(),
                        classification = %classified.classification,
                        "Classified function change"
                    );

                    let key = (file.path().to_string(), name);
                    match index.get(&key) {
                        Some(&i) => {
                            let existing = &mut out[i];
                            existing.classification =
                                existing.classification.combine(classified.classification);
                            if !existing.evidence.contains(&classified.evidence) {
                                existing.evidence =
                                    format!("{}; {}", existing.evidence, classified.evidence);
                            }
                        }
                        None => {
                            index.insert(key.clone(), out.len());
                            out.push(FunctionChange {
                                name: key.1,
                                containing_file: key.0,
                                classification: classified.classification,
                                evidence: classified.evidence,
                            });
                        }
                    }
                }
            }
        }

        out
    }

    /// Parse `diff_text` and run the per-function overlay.
    pub fn classify_diff(&self, diff_text: &str) -> Vec<FunctionChange> {
        self.classify_files(&parse_unified_diff(diff_text))
    }
}

/// Rebuild the old and new text of a region from its lines
fn reconstruct(lines: &[&DiffLine]) -> (String, String) {
    let mut old = String::new();
    let mut new = String::new();
    for line in lines {
        if line.kind != LineKind::Added {
            old.push_str(&line.text);
            old.push('\n');
        }
        if line.kind != LineKind::Removed {
            new.push_str(&line.text);
            new.push('\n');
        }
    }
    (old, new)
}
