//! REST implementation of [`rollup::ChecksApi`].
//!
//! This is the only place that interprets GitHub status codes. Listing
//! expects `200 OK` and creation expects `201 Created`; anything else becomes
//! an [`UpstreamError`]. Nothing is retried.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use rollup::{
    AppId, CheckRunId, CheckRunRecord, ChecksApi, CommitSha, CreateCheckRun, Repository,
    UpstreamError, UpstreamOperation,
};

use crate::auth::TokenSource;

/// Base URL of the public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// `User-Agent` sent with every request (GitHub rejects requests without one).
pub const USER_AGENT: &str = concat!("checks-rollup/", env!("CARGO_PKG_VERSION"));

const API_VERSION: &str = "2022-11-28";

/// Largest page size the check-runs endpoint accepts.
const PER_PAGE: usize = 100;

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("failed to build GitHub HTTP client: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

#[derive(Debug, Deserialize)]
struct CheckRunsPage {
    total_count: u64,
    check_runs: Vec<CheckRunRecord>,
}

#[derive(Debug, Deserialize)]
struct CreatedCheckRun {
    id: CheckRunId,
}

/// GitHub REST client for the checks API.
#[derive(Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenSource,
}

impl GitHubClient {
    /// Creates a client for the API rooted at `base_url`
    /// (e.g. [`DEFAULT_API_URL`] or a GitHub Enterprise `/api/v3` URL).
    pub fn new(base_url: impl Into<String>, tokens: TokenSource) -> Result<Self, ClientBuildError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn token(
        &self,
        operation: UpstreamOperation,
        commit: &CommitSha,
    ) -> Result<String, UpstreamError> {
        self.tokens
            .token(&self.http, &self.base_url)
            .await
            .map_err(|e| UpstreamError::Authentication {
                operation,
                commit: commit.clone(),
                message: e.to_string(),
            })
    }
}

fn transport(operation: UpstreamOperation, commit: &CommitSha, err: reqwest::Error) -> UpstreamError {
    UpstreamError::Transport {
        operation,
        commit: commit.clone(),
        message: err.to_string(),
    }
}

fn invalid_body(operation: UpstreamOperation, commit: &CommitSha, err: reqwest::Error) -> UpstreamError {
    UpstreamError::InvalidResponse {
        operation,
        commit: commit.clone(),
        message: err.to_string(),
    }
}

fn expect_status(
    actual: StatusCode,
    expected: StatusCode,
    operation: UpstreamOperation,
    commit: &CommitSha,
) -> Result<(), UpstreamError> {
    if actual == expected {
        Ok(())
    } else {
        Err(UpstreamError::UnexpectedStatus {
            operation,
            commit: commit.clone(),
            status: actual.as_u16(),
            expected: expected.as_u16(),
        })
    }
}

#[async_trait]
impl ChecksApi for GitHubClient {
    #[instrument(skip_all, fields(repository = %repository, commit = %commit, %app_id))]
    async fn list_check_runs_for_commit(
        &self,
        repository: &Repository,
        commit: &CommitSha,
        app_id: AppId,
    ) -> Result<Vec<CheckRunRecord>, UpstreamError> {
        const OP: UpstreamOperation = UpstreamOperation::ListCheckRuns;

        let token = self.token(OP, commit).await?;
        let url = format!(
            "{}/repos/{}/{}/commits/{}/check-runs",
            self.base_url, repository.owner, repository.name, commit
        );

        let mut records = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(&[
                    ("app_id", app_id.to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .map_err(|e| transport(OP, commit, e))?;

            expect_status(response.status(), StatusCode::OK, OP, commit)?;

            let body: CheckRunsPage = response
                .json()
                .await
                .map_err(|e| invalid_body(OP, commit, e))?;

            let received = body.check_runs.len();
            records.extend(body.check_runs);
            debug!(page, received, total = body.total_count, "Fetched check run page");

            if received == 0 || records.len() as u64 >= body.total_count {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    #[instrument(skip_all, fields(repository = %repository, commit = %request.head_sha, name = %request.name))]
    async fn create_check_run(
        &self,
        repository: &Repository,
        request: &CreateCheckRun,
    ) -> Result<CheckRunId, UpstreamError> {
        const OP: UpstreamOperation = UpstreamOperation::CreateCheckRun;
        let commit = &request.head_sha;

        let token = self.token(OP, commit).await?;
        let url = format!(
            "{}/repos/{}/{}/check-runs",
            self.base_url, repository.owner, repository.name
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(request)
            .send()
            .await
            .map_err(|e| transport(OP, commit, e))?;

        expect_status(response.status(), StatusCode::CREATED, OP, commit)?;

        let created: CreatedCheckRun = response
            .json()
            .await
            .map_err(|e| invalid_body(OP, commit, e))?;
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client =
            GitHubClient::new("https://ghe.example.com/api/v3/", TokenSource::static_token("t"))
                .unwrap();
        assert_eq!(client.base_url(), "https://ghe.example.com/api/v3");
    }

    #[test]
    fn expect_status_reports_both_codes() {
        let commit = CommitSha::new("abc").unwrap();
        let err = expect_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            StatusCode::CREATED,
            UpstreamOperation::CreateCheckRun,
            &commit,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            UpstreamError::UnexpectedStatus {
                status: 422,
                expected: 201,
                ..
            }
        ));
    }
}
