//! checks-rollup webhook receiver.
//!
//! Binds an HTTP server that accepts GitHub App webhook deliveries, validates
//! their HMAC-SHA256 signature, decodes `check_run` payloads into
//! [`rollup::CheckRunEvent`] and hands them to the [`rollup::Aggregator`].
//!
//! ## Response Codes
//!
//! | Situation | Status |
//! |-----------|--------|
//! | Missing, malformed or wrong signature | `400` |
//! | Payload does not decode | `400` |
//! | Listing or creating check runs failed | `500` |
//! | Event handled, filtered out or ignored | `200` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details, signature checks and payload
//! deserialization all live here. The [`rollup`] crate sees only
//! [`rollup::CheckRunEvent`].

pub mod event;
pub mod server;
pub mod signature;

pub use event::{
    decode, extract_payload, DecodeError, WebhookEvent, DELIVERY_HEADER, EVENT_HEADER,
};
pub use server::{router, serve, DeliveryOutcome, ListenerState, WebhookError};
pub use signature::{sign, verify, SignatureError, WebhookSecret, SIGNATURE_HEADER};
