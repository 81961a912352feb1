//! In-memory fake of [`ChecksApi`] (testing only).
//!
//! [`RecordingChecksApi`] serves a fixed list of check runs and records every
//! call so tests can assert on what was fetched and published.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    AppId, CheckRunId, CheckRunRecord, ChecksApi, CommitSha, CreateCheckRun, Repository,
    UpstreamError, UpstreamOperation,
};

/// One recorded listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCall {
    pub repository: Repository,
    pub commit: CommitSha,
    pub app_id: AppId,
}

#[derive(Debug, Default)]
struct State {
    list_calls: Vec<ListCall>,
    created: Vec<CreateCheckRun>,
    next_id: u64,
}

/// [`ChecksApi`] fake backed by a fixed set of check runs.
#[derive(Debug, Default)]
pub struct RecordingChecksApi {
    records: Vec<CheckRunRecord>,
    list_failure: Option<u16>,
    create_failure: Option<u16>,
    state: Mutex<State>,
}

impl RecordingChecksApi {
    /// Creates a fake that lists `records` for every commit.
    pub fn with_records(records: Vec<CheckRunRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Makes every listing call fail with `status`.
    pub fn fail_listing_with(mut self, status: u16) -> Self {
        self.list_failure = Some(status);
        self
    }

    /// Makes every creation call fail with `status`.
    pub fn fail_creation_with(mut self, status: u16) -> Self {
        self.create_failure = Some(status);
        self
    }

    /// Listing calls received so far, in order.
    pub fn list_calls(&self) -> Vec<ListCall> {
        self.state.lock().unwrap().list_calls.clone()
    }

    /// Check runs created so far, in order.
    pub fn created(&self) -> Vec<CreateCheckRun> {
        self.state.lock().unwrap().created.clone()
    }
}

#[async_trait]
impl ChecksApi for RecordingChecksApi {
    async fn list_check_runs_for_commit(
        &self,
        repository: &Repository,
        commit: &CommitSha,
        app_id: AppId,
    ) -> Result<Vec<CheckRunRecord>, UpstreamError> {
        self.state.lock().unwrap().list_calls.push(ListCall {
            repository: repository.clone(),
            commit: commit.clone(),
            app_id,
        });

        if let Some(status) = self.list_failure {
            return Err(UpstreamError::UnexpectedStatus {
                operation: UpstreamOperation::ListCheckRuns,
                commit: commit.clone(),
                status,
                expected: 200,
            });
        }
        Ok(self.records.clone())
    }

    async fn create_check_run(
        &self,
        _repository: &Repository,
        request: &CreateCheckRun,
    ) -> Result<CheckRunId, UpstreamError> {
        if let Some(status) = self.create_failure {
            return Err(UpstreamError::UnexpectedStatus {
                operation: UpstreamOperation::CreateCheckRun,
                commit: request.head_sha.clone(),
                status,
                expected: 201,
            });
        }

        let mut state = self.state.lock().unwrap();
        state.created.push(request.clone());
        state.next_id += 1;
        Ok(CheckRunId::new(state.next_id))
    }
}
