//! Top-level error types for the roll-up domain.
//!
//! [`UpstreamError`] is the only failure the aggregator can produce: the
//! classification and rendering steps are pure and infallible, so every error
//! originates in one of the two GitHub calls. Errors are never retried locally;
//! they abort the current event and are reported once to the caller.
//!
//! [`RollupError`] covers conditions that prevent the service from starting.

use thiserror::Error;

use crate::CommitSha;

// ---------------------------------------------------------------------------
// Upstream (GitHub API) errors
// ---------------------------------------------------------------------------

/// The GitHub call an [`UpstreamError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamOperation {
    /// `GET /repos/{owner}/{repo}/commits/{sha}/check-runs`
    ListCheckRuns,
    /// `POST /repos/{owner}/{repo}/check-runs`
    CreateCheckRun,
}

impl std::fmt::Display for UpstreamOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListCheckRuns => f.write_str("listing check runs"),
            Self::CreateCheckRun => f.write_str("creating check run"),
        }
    }
}

// ---------------------------------------------------------------------------

/// A check-run listing or creation call failed.
///
/// Every variant carries the operation and the commit so a single log line is
/// enough to diagnose the failure.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be sent or the connection failed.
    #[error("error {operation} for commit {commit}: {message}")]
    Transport {
        operation: UpstreamOperation,
        commit: CommitSha,
        message: String,
    },

    /// GitHub answered with a status code other than the expected one.
    #[error("error {operation} for commit {commit}: unexpected status {status} (expected {expected})")]
    UnexpectedStatus {
        operation: UpstreamOperation,
        commit: CommitSha,
        status: u16,
        expected: u16,
    },

    /// The response body could not be decoded.
    #[error("error {operation} for commit {commit}: invalid response body: {message}")]
    InvalidResponse {
        operation: UpstreamOperation,
        commit: CommitSha,
        message: String,
    },

    /// No access token could be obtained for the request.
    #[error("error {operation} for commit {commit}: authentication failed: {message}")]
    Authentication {
        operation: UpstreamOperation,
        commit: CommitSha,
        message: String,
    },
}

impl UpstreamError {
    /// Returns the GitHub call that failed.
    pub fn operation(&self) -> UpstreamOperation {
        match self {
            Self::Transport { operation, .. }
            | Self::UnexpectedStatus { operation, .. }
            | Self::InvalidResponse { operation, .. }
            | Self::Authentication { operation, .. } => *operation,
        }
    }

    /// Returns the commit whose processing failed.
    pub fn commit(&self) -> &CommitSha {
        match self {
            Self::Transport { commit, .. }
            | Self::UnexpectedStatus { commit, .. }
            | Self::InvalidResponse { commit, .. }
            | Self::Authentication { commit, .. } => commit,
        }
    }
}

// ---------------------------------------------------------------------------
// Service-level errors
// ---------------------------------------------------------------------------

/// Errors that stop the service before or while it runs.
#[derive(Debug, Error)]
pub enum RollupError {
    /// The configuration is invalid.
    ///
    /// Produced at load time; the service never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// Aggregating a commit failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
