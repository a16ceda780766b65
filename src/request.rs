//! Boundary request and response shapes
//!
//! Shared by the HTTP server and the CLI. Validation happens here, before
//! any analyzer or graph work.

use serde::{Deserialize, Serialize};

use crate::impact::{AnalysisError, ChangeSet, FileChange, ImpactReport};

/// Limits enforced on incoming requests
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub max_files: usize,
    pub max_diff_bytes: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_files: crate::config::Config::DEFAULT_MAX_FILES_PER_REQUEST,
            max_diff_bytes: crate::config::Config::DEFAULT_MAX_DIFF_BYTES,
        }
    }
}

fn default_project() -> String {
    "default".to_string()
}

/// `POST /analysis/impact` body
#[derive(Debug, Clone, Deserialize)]
pub struct ImpactRequest {
    #[serde(default)]
    pub files_changed: Vec<FileChange>,
    #[serde(default)]
    pub related_tests: Vec<String>,
    #[serde(default, alias = "git_diff")]
    pub diff_text: Option<String>,
    #[serde(default = "default_project")]
    pub project_id: String,
}

impl ImpactRequest {
    /// Validate against `limits` and build the change set.
    ///
    /// Returns the change set and the related-test hints.
    pub fn into_change_set(
        self,
        limits: &RequestLimits,
    ) -> Result<(ChangeSet, Vec<String>), AnalysisError> {
        if self.files_changed.is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "files_changed must not be empty".into(),
            ));
        }
        if self.files_changed.len() > limits.max_files {
            return Err(AnalysisError::InvalidRequest(format!(
                "too many files: {} (limit {})",
                self.files_changed.len(),
                limits.max_files
            )));
        }
        if let Some(i) = self.files_changed.iter().position(|f| f.path.trim().is_empty()) {
            return Err(AnalysisError::InvalidRequest(format!(
                "files_changed[{i}] has an empty path"
            )));
        }
        if self.project_id.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "project_id must not be empty".into(),
            ));
        }

        let mut change_set = ChangeSet::new(self.project_id, self.files_changed);
        match self.diff_text {
            Some(diff) if diff.len() > limits.max_diff_bytes => {
                return Err(AnalysisError::InvalidRequest(format!(
                    "diff_text is {} bytes (limit {})",
                    diff.len(),
                    limits.max_diff_bytes
                )));
            }
            Some(diff) if !diff.trim().is_empty() => change_set = change_set.with_diff(diff),
            _ => {}
        }
        Ok((change_set, self.related_tests))
    }
}

/// Successful response body
pub type ImpactResponse = ImpactReport;

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_code: String,
    pub retryable: bool,
}

impl From<&AnalysisError> for ErrorBody {
    fn from(err: &AnalysisError) -> Self {
        Self {
            error: err.to_string(),
            error_code: err.error_code().to_string(),
            retryable: err.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphError;
    use crate::impact::ChangeKind;

    fn parse(json: &str) -> ImpactRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_aliases_and_defaults() {
        let req = parse(
            r#"{"files_changed":[{"path":"a.py","change_type":"deleted"},{"path":"b.py"}],
                "git_diff":"diff --git a/a.py b/a.py\n"}"#,
        );
        assert_eq!(req.project_id, "default");
        assert!(req.related_tests.is_empty());
        assert_eq!(req.files_changed[0].change_kind, ChangeKind::Removed);
        assert_eq!(req.files_changed[1].change_kind, ChangeKind::Modified);

        let (cs, related) = req.into_change_set(&RequestLimits::default()).unwrap();
        assert!(cs.diff_text().is_some());
        assert!(related.is_empty());
    }

    #[test]
    fn test_empty_files_rejected() {
        let err = parse(r#"{"files_changed":[],"related_tests":["tests/test_x.py"]}"#)
            .into_change_set(&RequestLimits::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));
        let err = parse(r#"{}"#)
            .into_change_set(&RequestLimits::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    }

    #[test]
    fn test_limits_enforced() {
        let limits = RequestLimits {
            max_files: 1,
            max_diff_bytes: 4,
        };
        let err = parse(r#"{"files_changed":[{"path":"a.py"},{"path":"b.py"}]}"#)
            .into_change_set(&limits)
            .unwrap_err();
        assert!(err.to_string().contains("too many files"));

        let err = parse(r#"{"files_changed":[{"path":"a.py"}],"diff_text":"0123456789"}"#)
            .into_change_set(&limits)
            .unwrap_err();
        assert!(err.to_string().contains("limit 4"));

        let err = parse(r#"{"files_changed":[{"path":"  "}]}"#)
            .into_change_set(&limits)
            .unwrap_err();
        assert!(err.to_string().contains("empty path"));
    }

    #[test]
    fn test_blank_diff_is_absent() {
        let (cs, _) = parse(r#"{"files_changed":[{"path":"a.py"}],"diff_text":"  \n"}"#)
            .into_change_set(&RequestLimits::default())
            .unwrap();
        assert!(cs.diff_text().is_none());
    }

    #[test]
    fn test_error_body() {
        let err = AnalysisError::CollaboratorUnavailable {
            function: "f".into(),
            source: GraphError::Unavailable("down".into()),
        };
        let body = ErrorBody::from(&err);
        assert_eq!(body.error_code, "collaborator_unavailable");
        assert!(body.retryable);
        assert!(body.error.contains("down"));
    }
}
