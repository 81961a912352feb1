//! Decoding of validated webhook payloads into typed events.
//!
//! `X-GitHub-Event` selects the schema. Only `check_run` and `ping` are
//! decoded; every other kind just has to be well-formed JSON and is passed on
//! as [`WebhookEvent::Other`] so the caller can log and ignore it.

use std::borrow::Cow;

use serde::de::value::StrDeserializer;
use serde::de::{IgnoredAny, IntoDeserializer};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use rollup::{
    AppId, AppName, AppRef, CheckConclusion, CheckName, CheckRunEvent, CheckStatus, CommitSha,
    OwnerLogin, Repository, RepositoryName,
};

/// Header naming the event kind.
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the delivery GUID.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The payload does not match the schema of its declared event kind.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("missing X-GitHub-Event header")]
    MissingEventType,

    #[error("form-encoded delivery has no payload field")]
    MissingFormPayload,

    #[error("invalid {kind} payload: {message}")]
    InvalidPayload { kind: String, message: String },

    #[error("invalid {kind} payload: field {field} is empty")]
    EmptyField { kind: String, field: &'static str },
}

/// A decoded webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A check run was created, completed, re-requested, etc.
    CheckRun {
        action: String,
        event: CheckRunEvent,
    },
    /// Sent once when the webhook is configured.
    Ping { zen: Option<String> },
    /// Any other event kind.
    Other { kind: String },
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CheckRunPayload {
    action: String,
    check_run: WireCheckRun,
    repository: WireRepository,
}

#[derive(Debug, Deserialize)]
struct WireCheckRun {
    name: String,
    status: CheckStatus,
    #[serde(default, deserialize_with = "blank_conclusion_as_none")]
    conclusion: Option<CheckConclusion>,
    head_sha: String,
    app: WireApp,
}

// Unfinished runs carry `null`, but an empty string means the same thing.
fn blank_conclusion_as_none<'de, D>(deserializer: D) -> Result<Option<CheckConclusion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let value: StrDeserializer<'_, D::Error> = value.into_deserializer();
            CheckConclusion::deserialize(value).map(Some)
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireApp {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireRepository {
    name: String,
    owner: WireOwner,
}

#[derive(Debug, Deserialize)]
struct WireOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct PingPayload {
    #[serde(default)]
    zen: Option<String>,
}

// ---------------------------------------------------------------------------

/// Returns the JSON document of a delivery.
///
/// Webhooks configured with the `application/x-www-form-urlencoded` content
/// type carry the JSON in a `payload` form field.
pub fn extract_payload<'a>(
    content_type: Option<&str>,
    body: &'a [u8],
) -> Result<Cow<'a, [u8]>, DecodeError> {
    let is_form = content_type
        .map(|ct| ct.trim().starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false);
    if !is_form {
        return Ok(Cow::Borrowed(body));
    }

    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| Cow::Owned(value.into_owned().into_bytes()))
        .ok_or(DecodeError::MissingFormPayload)
}

/// Decodes `payload` according to the `X-GitHub-Event` value `kind`.
pub fn decode(kind: Option<&str>, payload: &[u8]) -> Result<WebhookEvent, DecodeError> {
    let kind = kind
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(DecodeError::MissingEventType)?;

    let invalid = |e: serde_json::Error| DecodeError::InvalidPayload {
        kind: kind.to_string(),
        message: e.to_string(),
    };

    match kind {
        "check_run" => {
            let payload: CheckRunPayload = serde_json::from_slice(payload).map_err(invalid)?;
            into_check_run(kind, payload)
        }
        "ping" => {
            let payload: PingPayload = serde_json::from_slice(payload).map_err(invalid)?;
            Ok(WebhookEvent::Ping { zen: payload.zen })
        }
        other => {
            serde_json::from_slice::<IgnoredAny>(payload).map_err(invalid)?;
            Ok(WebhookEvent::Other {
                kind: other.to_string(),
            })
        }
    }
}

fn into_check_run(kind: &str, payload: CheckRunPayload) -> Result<WebhookEvent, DecodeError> {
    let empty = |field: &'static str| DecodeError::EmptyField {
        kind: kind.to_string(),
        field,
    };

    let run = payload.check_run;
    let event = CheckRunEvent {
        name: CheckName::new(run.name).ok_or_else(|| empty("check_run.name"))?,
        app: AppRef {
            id: AppId::new(run.app.id),
            name: AppName::new(run.app.name).ok_or_else(|| empty("check_run.app.name"))?,
        },
        status: run.status,
        conclusion: run.conclusion,
        head_sha: CommitSha::new(run.head_sha).ok_or_else(|| empty("check_run.head_sha"))?,
        repository: Repository::new(
            OwnerLogin::new(payload.repository.owner.login)
                .ok_or_else(|| empty("repository.owner.login"))?,
            RepositoryName::new(payload.repository.name)
                .ok_or_else(|| empty("repository.name"))?,
        ),
    };

    Ok(WebhookEvent::CheckRun {
        action: payload.action,
        event,
    })
}
