//! Port traits implemented by infrastructure crates.
//!
//! The aggregator depends only on [`ChecksApi`]; the `github` crate supplies
//! the REST implementation and [`crate::fakes`] an in-memory one.

use async_trait::async_trait;

use crate::{AppId, CheckRunId, CheckRunRecord, CommitSha, CreateCheckRun, Repository, UpstreamError};

/// Read and write access to the check runs of a repository.
#[async_trait]
pub trait ChecksApi: Send + Sync {
    /// Returns every check run `app_id` has reported on `commit`.
    ///
    /// The result is a point-in-time snapshot. Fails with [`UpstreamError`] if
    /// the call cannot be made or GitHub does not answer `200 OK`.
    async fn list_check_runs_for_commit(
        &self,
        repository: &Repository,
        commit: &CommitSha,
        app_id: AppId,
    ) -> Result<Vec<CheckRunRecord>, UpstreamError>;

    /// Creates a new check run and returns its identifier.
    ///
    /// Fails with [`UpstreamError`] if the call cannot be made or GitHub does
    /// not answer `201 Created`.
    async fn create_check_run(
        &self,
        repository: &Repository,
        request: &CreateCheckRun,
    ) -> Result<CheckRunId, UpstreamError>;
}
