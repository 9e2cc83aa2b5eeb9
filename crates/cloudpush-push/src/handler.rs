//! The axum endpoint the control plane pushes subscription messages to.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use cloudpush_auth::{ActionType, Headers, ObjectType};
use cloudpush_client::{Client, SubscriptionPushParams};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::callback::{PushedMessage, SubscriptionCallback};
use crate::config::PushConfig;
use crate::delivery::{Delivery, DeliveryState};
use crate::error::{PushError, Result};

/// Lists the push protocol versions the peer can speak, comma separated.
/// May be repeated.
pub const PUSH_ACCEPT_VERSION_HEADER: HeaderName =
    HeaderName::from_static("x-cloudpush-push-accept-version");

/// The push protocol version this handler answered with.
pub const PUSH_VERSION_HEADER: HeaderName = HeaderName::from_static("x-cloudpush-push-version");

/// The only push protocol version implemented.
pub const PUSH_VERSION: &str = "1";

/// Handles pushes for one subscription.
///
/// Cloning is cheap.
#[derive(Clone)]
pub struct SubscriptionHandler {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    subscription_id: Arc<str>,
    callback: Arc<dyn SubscriptionCallback>,
    config: PushConfig,
}

impl SubscriptionHandler {
    pub fn new(
        client: Client,
        subscription_id: impl Into<String>,
        callback: impl SubscriptionCallback + 'static,
        config: PushConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                subscription_id: Arc::from(subscription_id.into()),
                callback: Arc::new(callback),
                config,
            }),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.inner.subscription_id
    }

    /// A router serving this handler at `path` (POST only).
    pub fn into_router(self, path: &str) -> Router {
        Router::new()
            .route(path, post(handle_push))
            .with_state(self)
    }

    /// Answer one push request.
    ///
    /// On success the response is `200 OK` with an event stream, and a task
    /// has been spawned to drive the delivery. The callback starts once the
    /// response body is first polled. On failure nothing has been spawned and
    /// the callback never runs.
    pub async fn handle(&self, headers: &HeaderMap, body: Bytes) -> Result<Response> {
        negotiate_version(headers)?;
        let message = self.admit(headers, &body)?;

        let (tx, rx) = mpsc::channel(self.inner.config.event_buffer.max(1));
        let (opened_tx, opened_rx) = oneshot::channel();
        let mut opened_tx = Some(opened_tx);
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::CONNECTION, "keep-alive")
            .header(PUSH_VERSION_HEADER, PUSH_VERSION)
            .body(Body::from_stream(ReceiverStream::new(rx).map(move |frame| {
                // The body is only polled once the head has been written.
                if let Some(opened) = opened_tx.take() {
                    let _ = opened.send(());
                }
                Ok::<_, Infallible>(frame)
            })))
            .map_err(|err| PushError::Internal(err.to_string()))?;

        let delivery = Delivery::new(
            Arc::clone(&self.inner.subscription_id),
            message,
            Arc::clone(&self.inner.callback),
            self.inner.config.clone(),
        )
        .wait_until_opened(opened_rx);
        tokio::spawn(async move {
            let report = delivery.run(tx).await;
            debug!(?report, "delivery finished");
        });

        Ok(response)
    }

    /// Verify the request and decode its body.
    fn admit(&self, headers: &HeaderMap, body: &[u8]) -> Result<PushedMessage> {
        let auth = Headers::new(
            header_str(headers, &header::AUTHORIZATION),
            header_str(headers, &header::DATE),
        );

        let params: SubscriptionPushParams = self
            .inner
            .client
            .verify_and_decode(
                &auth,
                body,
                ObjectType::PubsubMsg,
                ActionType::Read,
                &[self.inner.subscription_id.as_bytes()],
            )
            .map_err(|err| {
                warn!(
                    subscription_id = %self.inner.subscription_id,
                    state = ?DeliveryState::Rejected,
                    error = %err,
                    "error while verifying pushed message"
                );
                PushError::from(err)
            })?;

        debug!(
            subscription_id = %self.inner.subscription_id,
            message_id = %params.message_id,
            delivery_attempt = params.delivery_attempt,
            "push admitted"
        );
        Ok(params.into())
    }
}

impl std::fmt::Debug for SubscriptionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandler")
            .field("subscription_id", &self.inner.subscription_id)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

async fn handle_push(
    State(handler): State<SubscriptionHandler>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    handler.handle(&headers, body).await
}

/// Check the peer accepts a version this handler speaks.
fn negotiate_version(headers: &HeaderMap) -> Result<()> {
    let requested: BTreeSet<String> = headers
        .get_all(&PUSH_ACCEPT_VERSION_HEADER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|version| version.trim().to_string())
        .filter(|version| !version.is_empty())
        .collect();

    if requested.contains(PUSH_VERSION) {
        return Ok(());
    }

    let err = PushError::UnsupportedVersion {
        requested: requested.into_iter().collect(),
    };
    warn!(error = %err, "push received with versions this handler cannot accept");
    Err(err)
}

/// A header's value, or empty if missing or not visible ASCII.
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
