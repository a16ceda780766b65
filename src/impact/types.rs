//! Data types for impact analysis

use serde::{Deserialize, Serialize};

/// How a file was touched by a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    #[serde(alias = "deleted")]
    Removed,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Removed => write!(f, "removed"),
        }
    }
}

impl std::str::FromStr for ChangeKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "added" | "add" | "a" => Ok(ChangeKind::Added),
            "modified" | "modify" | "m" => Ok(ChangeKind::Modified),
            "removed" | "deleted" | "d" => Ok(ChangeKind::Removed),
            _ => Err(format!(
                "Unknown change kind '{s}'. Valid options: added, modified, removed"
            )),
        }
    }
}

/// One changed file in a change set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(alias = "change_type", default = "default_change_kind")]
    pub change_kind: ChangeKind,
}

fn default_change_kind() -> ChangeKind {
    ChangeKind::Modified
}

impl FileChange {
    pub fn new(path: impl Into<String>, change_kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            change_kind,
        }
    }
}

/// The input unit of one analysis: files, optional diff text, project.
///
/// Immutable once built; constructed per request and dropped with it.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    project_id: String,
    files: Vec<FileChange>,
    diff_text: Option<String>,
}

impl ChangeSet {
    pub fn new(project_id: impl Into<String>, files: Vec<FileChange>) -> Self {
        Self {
            project_id: project_id.into(),
            files,
            diff_text: None,
        }
    }

    /// Attach raw unified diff text
    pub fn with_diff(mut self, diff_text: impl Into<String>) -> Self {
        self.diff_text = Some(diff_text.into());
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn files(&self) -> &[FileChange] {
        &self.files
    }

    pub fn diff_text(&self) -> Option<&str> {
        self.diff_text.as_deref()
    }
}

/// Whether a change can alter runtime behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Functional,
    NonFunctional,
    /// Both behavioural and cosmetic edits in the same function
    Mixed,
}

impl Classification {
    /// Mixed changes are traversed like functional ones
    pub fn is_functional(self) -> bool {
        !matches!(self, Classification::NonFunctional)
    }

    /// Combine verdicts for the same function across hunks
    pub fn combine(self, other: Classification) -> Classification {
        use Classification::*;
        match (self, other) {
            (a, b) if a == b => a,
            _ => Mixed,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Functional => write!(f, "functional"),
            Classification::NonFunctional => write!(f, "non_functional"),
            Classification::Mixed => write!(f, "mixed"),
        }
    }
}

/// A changed function with its classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionChange {
    pub name: String,
    pub containing_file: String,
    pub classification: Classification,
    /// Human-readable summary of why the classification was reached
    pub evidence: String,
}

/// Severity of one impacted test or of the whole report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Informational,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::None => write!(f, "none"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Informational => write!(f, "informational"),
        }
    }
}

/// What the caller should do with the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestedAction {
    NoAction,
    RunAffectedTests,
    RunAllTests,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::NoAction => write!(f, "no-action"),
            SuggestedAction::RunAffectedTests => write!(f, "run-affected-tests"),
            SuggestedAction::RunAllTests => write!(f, "run-all-tests"),
        }
    }
}

/// Confidence tiers. Each tier owns one score and one severity, and the
/// score bands never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImpactTier {
    NonFunctional,
    RelatedHint,
    TransitiveCaller,
    DirectCaller,
    DirectEdit,
}

impl ImpactTier {
    pub fn score(self) -> f64 {
        match self {
            ImpactTier::DirectEdit => 1.0,
            ImpactTier::DirectCaller => 0.9,
            ImpactTier::TransitiveCaller => 0.7,
            ImpactTier::RelatedHint => 0.3,
            ImpactTier::NonFunctional => 0.1,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ImpactTier::DirectEdit | ImpactTier::DirectCaller => Severity::High,
            ImpactTier::TransitiveCaller => Severity::Medium,
            ImpactTier::RelatedHint => Severity::Low,
            ImpactTier::NonFunctional => Severity::Informational,
        }
    }
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// One impacted test (or, for the non-functional tier, one touched file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactItem {
    pub test_path: String,
    pub impact_score: f64,
    pub severity: Severity,
    /// Always present; empty means no specific reason was recorded
    #[serde(default)]
    pub reasons: Vec<String>,
    /// Reasons dropped by the per-item cap
    #[serde(default, skip_serializing_if = "is_zero")]
    pub suppressed_reasons: usize,
}

impl ImpactItem {
    pub fn new(test_path: impl Into<String>, tier: ImpactTier, reason: impl Into<String>) -> Self {
        Self {
            test_path: test_path.into(),
            impact_score: tier.score(),
            severity: tier.severity(),
            reasons: vec![reason.into()],
            suppressed_reasons: 0,
        }
    }
}

/// Result of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    /// Unique by `test_path`, highest score first
    pub impacted_tests: Vec<ImpactItem>,
    #[serde(rename = "severity")]
    pub overall_severity: Severity,
    pub suggested_action: SuggestedAction,
}
