//! Shared value types for the check-run roll-up domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! the state of check runs and the requests built from them. Optional GitHub
//! fields (`conclusion`, `details_url`) are `Option`s rather than empty strings
//! so that "no conclusion yet" cannot be confused with an unrecognised one.

use serde::{Deserialize, Serialize};

use crate::{AppId, AppName, CheckName, CommitSha, OwnerLogin, RepositoryName};

// ---------------------------------------------------------------------------
// Check run state
// ---------------------------------------------------------------------------

/// Lifecycle status of a check run.
///
/// GitHub may introduce new status values at any time; those decode to
/// [`CheckStatus::Unknown`] and are treated as not yet completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,
    /// Any status value this build does not know about.
    #[serde(other)]
    Unknown,
}

impl CheckStatus {
    /// Returns the GitHub wire representation of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Waiting => "waiting",
            Self::Requested => "requested",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Terminal outcome of a completed check run.
///
/// Unrecognised values decode to [`CheckConclusion::Unknown`], which the
/// classifier treats as success-like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
    Stale,
    Skipped,
    /// Any conclusion value this build does not know about.
    #[serde(other)]
    Unknown,
}

impl CheckConclusion {
    /// Returns the GitHub wire representation of the conclusion.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
            Self::ActionRequired => "action_required",
            Self::Stale => "stale",
            Self::Skipped => "skipped",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CheckConclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Repository and application identity
// ---------------------------------------------------------------------------

/// A GitHub repository addressed by owner login and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub owner: OwnerLogin,
    pub name: RepositoryName,
}

impl Repository {
    pub fn new(owner: OwnerLogin, name: RepositoryName) -> Self {
        Self { owner, name }
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------

/// The GitHub App that owns a check run, as reported in a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRef {
    pub id: AppId,
    pub name: AppName,
}

// ---------------------------------------------------------------------------

/// Identity of the CI application whose check runs are aggregated.
///
/// Deployments configure either the numeric app ID or the app's display name.
/// Both variants are compared against the app carried by each event through
/// [`ObservedApp::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedApp {
    Id(AppId),
    Name(AppName),
}

impl ObservedApp {
    /// Returns `true` if `app` is the observed application.
    pub fn matches(&self, app: &AppRef) -> bool {
        match self {
            Self::Id(id) => *id == app.id,
            Self::Name(name) => *name == app.name,
        }
    }
}

impl std::fmt::Display for ObservedApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "app #{id}"),
            Self::Name(name) => write!(f, "app '{name}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The latest state of one check run, as delivered by a `check_run` webhook.
///
/// GitHub only sets `conclusion` once `status` is
/// [`CheckStatus::Completed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunEvent {
    /// Name of the check run that changed.
    pub name: CheckName,
    pub app: AppRef,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
    pub head_sha: CommitSha,
    pub repository: Repository,
}

// ---------------------------------------------------------------------------

/// One existing check run on a commit, as returned by the listing API.
///
/// Several records may share a name when a check has been re-run; each one is
/// counted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunRecord {
    pub name: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub conclusion: Option<CheckConclusion>,
    #[serde(default)]
    pub details_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Title and Markdown summary shown on the synthetic check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
}

/// Body of a "create check run" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCheckRun {
    pub name: String,
    pub head_sha: CommitSha,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<CheckConclusion>,
    pub output: CheckRunOutput,
}
