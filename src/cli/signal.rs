//! Exit codes and Ctrl+C handling
//!
//! Ctrl+C cancels the running analysis through its token; the command
//! then exits with code 130.

use tokio_util::sync::CancellationToken;

use testradar::AnalysisError;

/// Exit codes for CLI commands
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Empty or malformed change set (EX_USAGE)
    InvalidRequest = 64,
    /// Dependency graph unavailable, retry later (EX_UNAVAILABLE)
    Unavailable = 69,
    /// User interrupted with Ctrl+C
    Interrupted = 130,
}

impl From<&AnalysisError> for ExitCode {
    fn from(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidRequest(_) => ExitCode::InvalidRequest,
            AnalysisError::CollaboratorUnavailable { .. } => ExitCode::Unavailable,
            AnalysisError::Cancelled => ExitCode::Interrupted,
        }
    }
}

/// Cancel `token` on the first Ctrl+C. Must be called inside a runtime.
pub fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                    return;
                }
                eprintln!("\nInterrupted. Cancelling analysis...");
                token.cancel();
            }
        }
    });
}
