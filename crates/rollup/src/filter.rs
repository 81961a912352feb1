//! Relevance filter for incoming check-run notifications.
//!
//! Only events from the observed application that carry a conclusion trigger
//! an aggregation. Everything else is dropped with one informational log line.

use tracing::info;

use crate::{CheckRunEvent, ObservedApp};

/// Why an event did not trigger an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The check run belongs to a different application.
    ForeignApp,
    /// The check run has not finished yet.
    NotConcluded,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignApp => f.write_str("check run belongs to an ignored app"),
            Self::NotConcluded => f.write_str("check run has no conclusion yet"),
        }
    }
}

fn decide(event: &CheckRunEvent, observed: &ObservedApp) -> Result<(), SkipReason> {
    if !observed.matches(&event.app) {
        return Err(SkipReason::ForeignApp);
    }
    if event.conclusion.is_none() {
        return Err(SkipReason::NotConcluded);
    }
    Ok(())
}

/// Returns `true` if `event` should be aggregated and logs the decision.
pub fn should_process(event: &CheckRunEvent, observed: &ObservedApp) -> bool {
    check(event, observed).is_ok()
}

/// Decides whether `event` should be aggregated, logging one line either way.
pub fn check(event: &CheckRunEvent, observed: &ObservedApp) -> Result<(), SkipReason> {
    let decision = decide(event, observed);
    match decision {
        Ok(()) => {
            info!(
                check = %event.name,
                status = %event.status,
                conclusion = event.conclusion.map(|c| c.as_str()).unwrap_or_default(),
                "Received check run event for {} check run {}",
                event.status,
                event.name,
            );
        }
        Err(SkipReason::ForeignApp) => {
            info!(
                app = %event.app.name,
                app_id = %event.app.id,
                "Received check run event for ignored app {:?}",
                event.app.name.as_str(),
            );
        }
        Err(SkipReason::NotConcluded) => {
            info!(
                check = %event.name,
                status = %event.status,
                "No conclusion yet for {} check run {}",
                event.status,
                event.name,
            );
        }
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AppId, AppName, AppRef, CheckConclusion, CheckName, CheckStatus, CommitSha, OwnerLogin,
        Repository, RepositoryName,
    };

    fn event(app_id: u64, app_name: &str, conclusion: Option<CheckConclusion>) -> CheckRunEvent {
        CheckRunEvent {
            name: CheckName::new("build").unwrap(),
            app: AppRef {
                id: AppId::new(app_id),
                name: AppName::new(app_name).unwrap(),
            },
            status: if conclusion.is_some() {
                CheckStatus::Completed
            } else {
                CheckStatus::InProgress
            },
            conclusion,
            head_sha: CommitSha::new("abc123").unwrap(),
            repository: Repository::new(
                OwnerLogin::new("octo").unwrap(),
                RepositoryName::new("widgets").unwrap(),
            ),
        }
    }

    #[test]
    fn accepts_finished_check_from_observed_app() {
        let observed = ObservedApp::Name(AppName::new("Buildkite").unwrap());
        assert!(should_process(
            &event(1, "Buildkite", Some(CheckConclusion::Success)),
            &observed
        ));
    }

    #[test]
    fn skips_other_apps() {
        let observed = ObservedApp::Id(AppId::new(1));
        let e = event(2, "Travis", Some(CheckConclusion::Failure));
        assert_eq!(decide(&e, &observed), Err(SkipReason::ForeignApp));
        assert!(!should_process(&e, &observed));
    }

    #[test]
    fn skips_unfinished_checks() {
        let observed = ObservedApp::Id(AppId::new(1));
        let e = event(1, "Buildkite", None);
        assert_eq!(decide(&e, &observed), Err(SkipReason::NotConcluded));
        assert!(!should_process(&e, &observed));
    }

    #[test]
    fn app_mismatch_is_reported_before_missing_conclusion() {
        let observed = ObservedApp::Id(AppId::new(1));
        let e = event(2, "Travis", None);
        assert_eq!(decide(&e, &observed), Err(SkipReason::ForeignApp));
    }
}
