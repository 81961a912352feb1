//! checks-rollup GitHub infrastructure adapter.
//!
//! Implements the [`rollup::ChecksApi`] trait over the GitHub REST API using
//! `reqwest`, and supplies the access tokens it needs: either a static token
//! or GitHub App installation tokens obtained with the app's private key.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! All GitHub API details (status codes, pagination, authentication) are
//! handled here; the [`rollup`] crate never sees them.

pub mod auth;
pub mod client;

pub use auth::{AppCredentials, AuthError, InstallationTokenProvider, TokenSource};
pub use client::{ClientBuildError, GitHubClient, DEFAULT_API_URL, USER_AGENT};
