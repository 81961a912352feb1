//! Integration tests for GitHubClient.
//!
//! Uses wiremock for HTTP mocking. Tests cover listing (filtering, pagination,
//! status mapping), creation (request body, status mapping) and the GitHub App
//! installation token exchange.

use github::{AppCredentials, GitHubClient, TokenSource};
use rollup::{
    AppId, CheckConclusion, CheckRunId, CheckRunOutput, CheckStatus, ChecksApi, CommitSha,
    CreateCheckRun, InstallationId, OwnerLogin, Repository, RepositoryName, UpstreamError,
    UpstreamOperation,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &[u8] = include_bytes!("fixtures/test-app-key.pem");

fn repository() -> Repository {
    Repository::new(
        OwnerLogin::new("octo").unwrap(),
        RepositoryName::new("widgets").unwrap(),
    )
}

fn commit() -> CommitSha {
    CommitSha::new("abc123").unwrap()
}

fn create_test_client(mock_server: &MockServer) -> GitHubClient {
    GitHubClient::new(mock_server.uri(), TokenSource::static_token("test-token"))
        .expect("failed to create client")
}

fn check_run(name: &str, status: &str, conclusion: Option<&str>) -> serde_json::Value {
    json!({
        "id": 1,
        "name": name,
        "status": status,
        "conclusion": conclusion,
        "details_url": format!("https://ci.example.com/{name}"),
        "head_sha": "abc123",
    })
}

fn synthetic_request() -> CreateCheckRun {
    CreateCheckRun {
        name: "Synthetic status for Buildkite".into(),
        head_sha: commit(),
        status: CheckStatus::Completed,
        conclusion: Some(CheckConclusion::Failure),
        output: CheckRunOutput {
            title: "1 successful, 1 failed".into(),
            summary: "## Failed checks:\n- lint;\n".into(),
        },
    }
}

#[tokio::test]
async fn test_list_check_runs_filters_by_app() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/commits/abc123/check-runs"))
        .and(query_param("app_id", "42"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "check_runs": [
                check_run("unit", "completed", Some("success")),
                check_run("lint", "in_progress", None),
            ],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let records = client
        .list_check_runs_for_commit(&repository(), &commit(), AppId::new(42))
        .await
        .expect("list failed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "unit");
    assert_eq!(records[0].conclusion, Some(CheckConclusion::Success));
    assert_eq!(
        records[0].details_url.as_deref(),
        Some("https://ci.example.com/unit")
    );
    assert_eq!(records[1].status, CheckStatus::InProgress);
    assert_eq!(records[1].conclusion, None);
}

#[tokio::test]
async fn test_list_check_runs_follows_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/commits/abc123/check-runs"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "check_runs": [
                check_run("a", "completed", Some("success")),
                check_run("b", "completed", Some("failure")),
            ],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/commits/abc123/check-runs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "check_runs": [check_run("c", "queued", None)],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let records = client
        .list_check_runs_for_commit(&repository(), &commit(), AppId::new(42))
        .await
        .expect("list failed");

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[tokio::test]
async fn test_list_check_runs_unexpected_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/commits/abc123/check-runs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .list_check_runs_for_commit(&repository(), &commit(), AppId::new(42))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UpstreamError::UnexpectedStatus {
            operation: UpstreamOperation::ListCheckRuns,
            status: 404,
            expected: 200,
            ..
        }
    ));
    assert_eq!(err.commit().as_str(), "abc123");
}

#[tokio::test]
async fn test_list_check_runs_invalid_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/commits/abc123/check-runs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .list_check_runs_for_commit(&repository(), &commit(), AppId::new(42))
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_list_check_runs_transport_failure() {
    // Nothing listens on the discard port.
    let client = GitHubClient::new("http://127.0.0.1:9", TokenSource::static_token("t")).unwrap();
    let err = client
        .list_check_runs_for_commit(&repository(), &commit(), AppId::new(42))
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Transport { .. }));
}

#[tokio::test]
async fn test_create_check_run_sends_report() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/check-runs"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "name": "Synthetic status for Buildkite",
            "head_sha": "abc123",
            "status": "completed",
            "conclusion": "failure",
            "output": {
                "title": "1 successful, 1 failed",
                "summary": "## Failed checks:\n- lint;\n",
            },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 4242 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let id = client
        .create_check_run(&repository(), &synthetic_request())
        .await
        .expect("create failed");

    assert_eq!(id, CheckRunId::new(4242));
}

#[tokio::test]
async fn test_create_check_run_requires_created_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/check-runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .create_check_run(&repository(), &synthetic_request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UpstreamError::UnexpectedStatus {
            operation: UpstreamOperation::CreateCheckRun,
            status: 200,
            expected: 201,
            ..
        }
    ));
}

#[tokio::test]
async fn test_installation_token_is_exchanged_once_and_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_installation",
            "expires_at": "2099-01-01T00:00:00Z",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/commits/abc123/check-runs"))
        .and(header("authorization", "Bearer ghs_installation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 0,
            "check_runs": [],
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let credentials =
        AppCredentials::from_pem(AppId::new(7), InstallationId::new(99), TEST_KEY).unwrap();
    let client = GitHubClient::new(mock_server.uri(), TokenSource::app(credentials)).unwrap();

    for _ in 0..2 {
        let records = client
            .list_check_runs_for_commit(&repository(), &commit(), AppId::new(42))
            .await
            .expect("list failed");
        assert!(records.is_empty());
    }
}

#[tokio::test]
async fn test_failed_token_exchange_is_an_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let credentials =
        AppCredentials::from_pem(AppId::new(7), InstallationId::new(99), TEST_KEY).unwrap();
    let client = GitHubClient::new(mock_server.uri(), TokenSource::app(credentials)).unwrap();

    let err = client
        .create_check_run(&repository(), &synthetic_request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UpstreamError::Authentication {
            operation: UpstreamOperation::CreateCheckRun,
            ..
        }
    ));
}
