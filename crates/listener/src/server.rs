//! The webhook HTTP endpoint.
//!
//! Every path except `/healthz` accepts deliveries. Each delivery runs
//! validate → extract → decode → dispatch in its own span, and the outcome is
//! mapped to a status code: `400` for bad signatures or payloads, `500` when
//! GitHub could not be read or written, `200` otherwise. Ignored and filtered
//! events return `200` so GitHub does not redeliver them.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};

use rollup::{Aggregator, DeliveryId, EventOutcome, UpstreamError};

use crate::event::{self, DecodeError, WebhookEvent, DELIVERY_HEADER, EVENT_HEADER};
use crate::signature::{self, SignatureError, WebhookSecret, SIGNATURE_HEADER};

/// GitHub caps webhook payloads at 25 MB.
const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Why a delivery was not processed.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Error validating payload: {0}")]
    Validation(#[from] SignatureError),

    #[error("Error parsing webhook: {0}")]
    Decode(#[from] DecodeError),

    #[error("Error handling check run event: {0}")]
    Upstream(#[from] UpstreamError),
}

impl WebhookError {
    /// Status code returned to the webhook sender.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Error validating payload",
            Self::Decode(_) => "Error parsing webhook",
            Self::Upstream(_) => "Error handling check run event",
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status_code(), self.public_message()).into_response()
    }
}

/// What happened to an accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// A check-run event went through the aggregator.
    CheckRun(EventOutcome),
    /// A ping was acknowledged.
    Pong,
    /// The event kind is not handled.
    Ignored { kind: String },
}

/// Everything a delivery needs: the webhook secret and the aggregator.
#[derive(Debug)]
pub struct ListenerState {
    secret: WebhookSecret,
    aggregator: Aggregator,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl ListenerState {
    pub fn new(secret: WebhookSecret, aggregator: Aggregator) -> Self {
        Self { secret, aggregator }
    }

    /// Validates, decodes and dispatches one delivery.
    pub async fn process_delivery(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<DeliveryOutcome, WebhookError> {
        signature::verify(&self.secret, body, header_str(headers, SIGNATURE_HEADER))?;
        let payload = event::extract_payload(header_str(headers, CONTENT_TYPE.as_str()), body)?;
        let event = event::decode(header_str(headers, EVENT_HEADER), &payload)?;

        match event {
            WebhookEvent::CheckRun { action, event } => {
                info!(%action, check = %event.name, "Dispatching check run event");
                let outcome = self.aggregator.handle_check_run(&event).await?;
                Ok(DeliveryOutcome::CheckRun(outcome))
            }
            WebhookEvent::Ping { zen } => {
                info!(zen = zen.as_deref().unwrap_or_default(), "Received ping");
                Ok(DeliveryOutcome::Pong)
            }
            WebhookEvent::Other { kind } => {
                info!("Received event of ignored type {kind:?}");
                Ok(DeliveryOutcome::Ignored { kind })
            }
        }
    }
}

async fn handle_webhook(
    State(state): State<Arc<ListenerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = DeliveryId::from_header(header_str(&headers, DELIVERY_HEADER));
    let kind = header_str(&headers, EVENT_HEADER).unwrap_or("unknown").to_string();
    let span = info_span!("webhook", %delivery, event = %kind);

    async move {
        match state.process_delivery(&headers, &body).await {
            Ok(_) => StatusCode::OK.into_response(),
            Err(err) => {
                if err.status_code().is_server_error() {
                    error!(error = %err, "Delivery failed");
                } else {
                    warn!(error = %err, "Delivery rejected");
                }
                err.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn healthz() -> &'static str {
    "ok"
}

/// Builds the webhook router.
pub fn router(state: Arc<ListenerState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(handle_webhook)
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .with_state(state)
}

/// Serves webhook deliveries on `addr` until `shutdown` completes.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<ListenerState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, "Listening for webhook deliveries");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
