//! The roll-up pipeline: filter, fetch, classify, derive, render, publish.
//!
//! Every call runs the steps strictly in sequence and keeps no state between
//! calls. The two GitHub calls are the only suspension points and the only
//! steps that can fail; a failed fetch means nothing is published.
//!
//! Two overlapping deliveries for the same commit are not serialised against
//! each other. Each reads its own snapshot and each creates its own synthetic
//! check run.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::filter::{self, SkipReason};
use crate::report::AggregateReport;
use crate::{
    AppName, AppRef, CheckRunEvent, CheckRunId, CheckRunRecord, ChecksApi, Classification,
    CommitSha, ObservedApp, Repository, UpstreamError,
};

/// Result of handling one check-run event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event was not relevant; nothing was fetched or published.
    Skipped(SkipReason),
    /// A synthetic check run was created.
    Published(Publication),
}

/// A synthetic check run created by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub check_run: CheckRunId,
    pub name: String,
    pub report: AggregateReport,
}

/// Aggregates the check runs of one observed application into a synthetic
/// check run.
#[derive(Clone)]
pub struct Aggregator {
    checks: Arc<dyn ChecksApi>,
    observed: ObservedApp,
    check_name: Option<String>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("observed", &self.observed)
            .field("check_name", &self.check_name)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    pub fn new(checks: Arc<dyn ChecksApi>, observed: ObservedApp) -> Self {
        Self {
            checks,
            observed,
            check_name: None,
        }
    }

    /// Publishes under a fixed name instead of `Synthetic status for <app>`.
    pub fn with_check_name(mut self, name: impl Into<String>) -> Self {
        self.check_name = Some(name.into());
        self
    }

    pub fn observed(&self) -> &ObservedApp {
        &self.observed
    }

    /// Name of the synthetic check run published for `app`.
    pub fn synthetic_name(&self, app: &AppName) -> String {
        match &self.check_name {
            Some(name) => name.clone(),
            None => format!("Synthetic status for {app}"),
        }
    }

    /// Filters `event` and, if it is relevant, aggregates its commit.
    pub async fn handle_check_run(
        &self,
        event: &CheckRunEvent,
    ) -> Result<EventOutcome, UpstreamError> {
        if let Err(reason) = filter::check(event, &self.observed) {
            return Ok(EventOutcome::Skipped(reason));
        }

        let publication = self
            .aggregate(&event.repository, &event.head_sha, &event.app)
            .await?;
        Ok(EventOutcome::Published(publication))
    }

    /// Fetches every check run `app` reported on `commit` and publishes the
    /// roll-up as a new check run.
    #[instrument(skip_all, fields(repository = %repository, commit = %commit, app_id = %app.id))]
    pub async fn aggregate(
        &self,
        repository: &Repository,
        commit: &CommitSha,
        app: &AppRef,
    ) -> Result<Publication, UpstreamError> {
        let records = self.fetch_checks_for_commit(repository, commit, app).await?;

        let classification = Classification::from_records(records);
        let report = AggregateReport::from_classification(&classification);

        info!(
            success = classification.success.len(),
            failure = classification.failure.len(),
            in_progress = classification.in_progress.len(),
            status = %report.status,
            conclusion = report.conclusion.map(|c| c.as_str()).unwrap_or_default(),
            "Aggregated check runs"
        );

        self.publish(repository, commit, app, report).await
    }

    /// Point-in-time snapshot of the check runs `app` reported on `commit`.
    pub async fn fetch_checks_for_commit(
        &self,
        repository: &Repository,
        commit: &CommitSha,
        app: &AppRef,
    ) -> Result<Vec<CheckRunRecord>, UpstreamError> {
        self.checks
            .list_check_runs_for_commit(repository, commit, app.id)
            .await
    }

    /// Creates a new synthetic check run carrying `report`. Never updates an
    /// earlier one.
    pub async fn publish(
        &self,
        repository: &Repository,
        commit: &CommitSha,
        app: &AppRef,
        report: AggregateReport,
    ) -> Result<Publication, UpstreamError> {
        let name = self.synthetic_name(&app.name);
        let request = report.clone().into_request(name.clone(), commit.clone());
        let check_run = self.checks.create_check_run(repository, &request).await?;

        info!(%check_run, check = %name, "Published synthetic check run");

        Ok(Publication {
            check_run,
            name,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::RecordingChecksApi;
    use crate::{
        AppId, CheckConclusion, CheckName, CheckRunRecord, CheckStatus, OwnerLogin,
        RepositoryName, UpstreamOperation,
    };

    fn repository() -> Repository {
        Repository::new(
            OwnerLogin::new("octo").unwrap(),
            RepositoryName::new("widgets").unwrap(),
        )
    }

    fn app() -> AppRef {
        AppRef {
            id: AppId::new(42),
            name: AppName::new("Buildkite").unwrap(),
        }
    }

    fn event(conclusion: Option<CheckConclusion>) -> CheckRunEvent {
        CheckRunEvent {
            name: CheckName::new("unit").unwrap(),
            app: app(),
            status: if conclusion.is_some() {
                CheckStatus::Completed
            } else {
                CheckStatus::InProgress
            },
            conclusion,
            head_sha: CommitSha::new("abc123").unwrap(),
            repository: repository(),
        }
    }

    fn record(name: &str, status: CheckStatus, conclusion: Option<CheckConclusion>) -> CheckRunRecord {
        CheckRunRecord {
            name: name.into(),
            status,
            conclusion,
            details_url: Some(format!("https://ci.example.com/{name}")),
        }
    }

    fn aggregator(api: &Arc<RecordingChecksApi>) -> Aggregator {
        Aggregator::new(api.clone(), ObservedApp::Name(AppName::new("Buildkite").unwrap()))
    }

    #[tokio::test]
    async fn mixed_success_and_failure_publishes_failure() {
        let api = Arc::new(RecordingChecksApi::with_records(vec![
            record("unit", CheckStatus::Completed, Some(CheckConclusion::Success)),
            record("lint", CheckStatus::Completed, Some(CheckConclusion::Failure)),
        ]));

        let outcome = aggregator(&api)
            .handle_check_run(&event(Some(CheckConclusion::Success)))
            .await
            .unwrap();

        let EventOutcome::Published(publication) = outcome else {
            panic!("expected a publication");
        };
        assert_eq!(publication.report.title, "1 successful, 1 failed");

        let lists = api.list_calls();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].commit.as_str(), "abc123");
        assert_eq!(lists[0].app_id, AppId::new(42));

        let created = api.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "Synthetic status for Buildkite");
        assert_eq!(created[0].head_sha.as_str(), "abc123");
        assert_eq!(created[0].status, CheckStatus::Completed);
        assert_eq!(created[0].conclusion, Some(CheckConclusion::Failure));
        assert_eq!(created[0].output.title, "1 successful, 1 failed");
    }

    #[tokio::test]
    async fn single_pending_check_publishes_in_progress() {
        let api = Arc::new(RecordingChecksApi::with_records(vec![record(
            "unit",
            CheckStatus::InProgress,
            None,
        )]));

        aggregator(&api)
            .handle_check_run(&event(Some(CheckConclusion::Success)))
            .await
            .unwrap();

        let created = api.created();
        assert_eq!(created[0].status, CheckStatus::InProgress);
        assert_eq!(created[0].conclusion, None);
        assert_eq!(created[0].output.title, "1 in progress");
    }

    #[tokio::test]
    async fn no_check_runs_still_publishes_success() {
        let api = Arc::new(RecordingChecksApi::default());

        aggregator(&api)
            .handle_check_run(&event(Some(CheckConclusion::Success)))
            .await
            .unwrap();

        let created = api.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].status, CheckStatus::Completed);
        assert_eq!(created[0].conclusion, Some(CheckConclusion::Success));
        assert_eq!(created[0].output.title, "");
        assert_eq!(created[0].output.summary, "");
    }

    #[tokio::test]
    async fn skipped_events_make_no_calls() {
        let api = Arc::new(RecordingChecksApi::default());
        let aggregator = aggregator(&api);

        let pending = aggregator.handle_check_run(&event(None)).await.unwrap();
        assert_eq!(pending, EventOutcome::Skipped(SkipReason::NotConcluded));

        let mut foreign = event(Some(CheckConclusion::Success));
        foreign.app.name = AppName::new("Travis").unwrap();
        let outcome = aggregator.handle_check_run(&foreign).await.unwrap();
        assert_eq!(outcome, EventOutcome::Skipped(SkipReason::ForeignApp));

        assert!(api.list_calls().is_empty());
        assert!(api.created().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_never_publishes() {
        let api = Arc::new(RecordingChecksApi::default().fail_listing_with(503));

        let err = aggregator(&api)
            .handle_check_run(&event(Some(CheckConclusion::Success)))
            .await
            .unwrap_err();

        assert_eq!(err.operation(), UpstreamOperation::ListCheckRuns);
        assert_eq!(err.commit().as_str(), "abc123");
        assert!(api.created().is_empty());
    }

    #[tokio::test]
    async fn failed_publish_is_propagated() {
        let api = Arc::new(RecordingChecksApi::default().fail_creation_with(422));

        let err = aggregator(&api)
            .handle_check_run(&event(Some(CheckConclusion::Failure)))
            .await
            .unwrap_err();

        assert_eq!(err.operation(), UpstreamOperation::CreateCheckRun);
    }

    #[tokio::test]
    async fn repeated_events_create_a_new_check_run_each_time() {
        let api = Arc::new(RecordingChecksApi::default());
        let aggregator = aggregator(&api);
        let e = event(Some(CheckConclusion::Success));

        let first = aggregator.handle_check_run(&e).await.unwrap();
        let second = aggregator.handle_check_run(&e).await.unwrap();

        assert_eq!(api.created().len(), 2);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn fixed_check_name_overrides_template() {
        let api = Arc::new(RecordingChecksApi::default());
        let aggregator = aggregator(&api).with_check_name("ci/rollup");

        aggregator
            .aggregate(&repository(), &CommitSha::new("def456").unwrap(), &app())
            .await
            .unwrap();

        assert_eq!(api.created()[0].name, "ci/rollup");
    }
}
