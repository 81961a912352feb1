//! Overall status derivation and Markdown rendering of the roll-up.

use crate::{
    CheckConclusion, CheckRunOutput, CheckRunRecord, CheckStatus, Classification, CommitSha,
    CreateCheckRun,
};

/// The aggregate built for one event and published once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
    pub title: String,
    pub summary: String,
}

impl AggregateReport {
    /// Derives the overall state and renders the output for `classification`.
    pub fn from_classification(classification: &Classification) -> Self {
        let (status, conclusion) = derive_overall(classification);
        let output = render(classification);
        Self {
            status,
            conclusion,
            title: output.title,
            summary: output.summary,
        }
    }

    /// Builds the "create check run" request carrying this report.
    pub fn into_request(self, name: String, head_sha: CommitSha) -> CreateCheckRun {
        CreateCheckRun {
            name,
            head_sha,
            status: self.status,
            conclusion: self.conclusion,
            output: CheckRunOutput {
                title: self.title,
                summary: self.summary,
            },
        }
    }
}

/// Derives the overall status and conclusion.
///
/// Priority is failure, then in-progress, then success. A commit without any
/// check run from the observed app resolves to `completed` / `success`: the
/// absence of checks is not treated as a failure.
pub fn derive_overall(classification: &Classification) -> (CheckStatus, Option<CheckConclusion>) {
    if !classification.failure.is_empty() {
        (CheckStatus::Completed, Some(CheckConclusion::Failure))
    } else if !classification.in_progress.is_empty() {
        (CheckStatus::InProgress, None)
    } else {
        (CheckStatus::Completed, Some(CheckConclusion::Success))
    }
}

/// Renders the title and Markdown summary.
///
/// Non-empty buckets appear in the order success, failure, in progress. When
/// every bucket is empty both strings are empty.
pub fn render(classification: &Classification) -> CheckRunOutput {
    let sections: [(&[CheckRunRecord], &str, &str); 3] = [
        (&classification.success, "successful", "Successful checks"),
        (&classification.failure, "failed", "Failed checks"),
        (&classification.in_progress, "in progress", "Checks in progress"),
    ];

    let mut title_parts = Vec::new();
    let mut summary_lines = Vec::new();

    for (records, counted, heading) in sections {
        if records.is_empty() {
            continue;
        }
        title_parts.push(format!("{} {}", records.len(), counted));
        summary_lines.push(format!("## {heading}:"));
        summary_lines.extend(records.iter().map(bullet));
        summary_lines.push(String::new());
    }

    CheckRunOutput {
        title: title_parts.join(", "),
        summary: summary_lines.join("\n"),
    }
}

fn bullet(record: &CheckRunRecord) -> String {
    match record.details_url.as_deref() {
        Some(url) if !url.is_empty() => format!("- [{}]({});", record.name, url),
        _ => format!("- {};", record.name),
    }
}
