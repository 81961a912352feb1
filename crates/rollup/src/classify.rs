//! Partitioning of fetched check runs into success, failure and in-progress.
//!
//! | status          | conclusion                                   | bucket      |
//! |-----------------|----------------------------------------------|-------------|
//! | not `completed` | ignored                                      | in progress |
//! | `completed`     | `failure`, `cancelled`, `stale`, `timed_out` | failure     |
//! | `completed`     | `action_required`                            | in progress |
//! | `completed`     | anything else, including unknown values      | success     |
//!
//! `action_required` waits on a human, so it is not resolved either way.
//! Conclusions not listed as failures count as success so that new values
//! introduced by GitHub do not break the roll-up.

use crate::{CheckConclusion, CheckRunRecord, CheckStatus};

/// One of the three classification buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Success,
    Failure,
    InProgress,
}

impl Bucket {
    /// Returns the bucket `record` belongs to.
    pub fn of(record: &CheckRunRecord) -> Self {
        match record.status {
            CheckStatus::Completed => match record.conclusion {
                Some(
                    CheckConclusion::Failure
                    | CheckConclusion::Cancelled
                    | CheckConclusion::Stale
                    | CheckConclusion::TimedOut,
                ) => Self::Failure,
                Some(CheckConclusion::ActionRequired) => Self::InProgress,
                _ => Self::Success,
            },
            _ => Self::InProgress,
        }
    }
}

/// The fetched check runs split into disjoint buckets.
///
/// Each bucket keeps the order in which records were ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub success: Vec<CheckRunRecord>,
    pub failure: Vec<CheckRunRecord>,
    pub in_progress: Vec<CheckRunRecord>,
}

impl Classification {
    /// Classifies every record into exactly one bucket.
    pub fn from_records(records: impl IntoIterator<Item = CheckRunRecord>) -> Self {
        let mut classification = Self::default();
        for record in records {
            classification.push(record);
        }
        classification
    }

    /// Adds one record to the bucket it belongs to.
    pub fn push(&mut self, record: CheckRunRecord) {
        match Bucket::of(&record) {
            Bucket::Success => self.success.push(record),
            Bucket::Failure => self.failure.push(record),
            Bucket::InProgress => self.in_progress.push(record),
        }
    }

    /// Total number of classified records.
    pub fn len(&self) -> usize {
        self.success.len() + self.failure.len() + self.in_progress.len()
    }

    /// Returns `true` if no record was classified.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
