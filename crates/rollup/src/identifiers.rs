//! Identifiers for the GitHub objects checks-rollup touches.
//!
//! Apps, installations and check runs are numbered by GitHub; commits,
//! owners, repositories and names are strings. Each gets its own newtype so an
//! [`AppId`] cannot be passed where an [`InstallationId`] is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Newtypes over GitHub-supplied strings. `new` trims surrounding whitespace
// and rejects what is left if it is empty, so a blank header, flag or payload
// field never becomes an identifier.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Option<Self> {
                let raw = raw.into();
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else if trimmed.len() == raw.len() {
                    Some(Self(raw))
                } else {
                    Some(Self(trimmed.to_owned()))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// Newtypes over GitHub-assigned integers. Serialised as the bare number.
macro_rules! u64_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Numeric identifiers
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a GitHub App (the CI application that owns check runs, or
    /// this service's own app registration).
    AppId
}

u64_id! {
    /// Identifies one installation of a GitHub App on an account.
    ///
    /// Installation access tokens are scoped to a single installation.
    InstallationId
}

u64_id! {
    /// Identifies a check run created on GitHub.
    CheckRunId
}

// ---------------------------------------------------------------------------
// Deliveries
// ---------------------------------------------------------------------------

/// Correlates the log lines of one webhook delivery.
///
/// Taken from the `X-GitHub-Delivery` GUID when it parses; otherwise a fresh
/// v4 UUID stands in for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(Uuid);

impl DeliveryId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses the `X-GitHub-Delivery` header value, falling back to a random
    /// identifier when the value is absent or not a UUID.
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Self)
            .unwrap_or_else(Self::new_random)
    }

    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

// ---------------------------------------------------------------------------
// Textual identifiers
// ---------------------------------------------------------------------------

string_id! {
    /// Head commit of a check suite. Usually a full 40-character SHA.
    CommitSha
}

string_id! {
    /// Login of the user or organisation that owns a repository.
    OwnerLogin
}

string_id! {
    /// Name of a repository, without the owner prefix.
    RepositoryName
}

string_id! {
    /// Display name of a GitHub App (e.g. `"Buildkite"`).
    AppName
}

string_id! {
    /// Name of a check run as shown in the GitHub checks UI.
    CheckName
}
