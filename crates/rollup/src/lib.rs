//! Core domain for checks-rollup.
//!
//! This crate contains every domain concept used to turn the check runs of one
//! CI application into a single synthetic check run: identifiers, check-run
//! value types, the relevance filter, classification, report rendering, and
//! the [`Aggregator`] that sequences them. Infrastructure crates implement the
//! [`ChecksApi`] port defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; `github` and `listener` define *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`AppId`, `CommitSha`, `DeliveryId`, etc.) |
//! | [`types`] | Check-run value types (`CheckStatus`, `CheckRunRecord`, `CreateCheckRun`, etc.) |
//! | [`errors`] | `UpstreamError` and `RollupError` |
//! | [`ports`] | The `ChecksApi` trait |
//! | [`filter`] | Relevance filter for check-run events |
//! | [`classify`] | Success / failure / in-progress partitioning |
//! | [`report`] | Overall status derivation and Markdown rendering |
//! | [`aggregator`] | The fetch → classify → publish pipeline |
//! | [`fakes`] | In-memory `ChecksApi` for tests |

pub mod aggregator;
pub mod classify;
pub mod errors;
pub mod fakes;
pub mod filter;
pub mod identifiers;
pub mod ports;
pub mod report;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use aggregator::{Aggregator, EventOutcome, Publication};
pub use classify::{Bucket, Classification};
pub use errors::{RollupError, UpstreamError, UpstreamOperation};
pub use filter::{should_process, SkipReason};
pub use identifiers::{
    AppId, AppName, CheckName, CheckRunId, CommitSha, DeliveryId, InstallationId, OwnerLogin,
    RepositoryName,
};
pub use ports::ChecksApi;
pub use report::{derive_overall, render, AggregateReport};
pub use types::{
    AppRef, CheckConclusion, CheckRunEvent, CheckRunOutput, CheckRunRecord, CheckStatus,
    CreateCheckRun, ObservedApp, Repository,
};
