//! The receiver callback invoked for every pushed message.

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use cloudpush_client::SubscriptionPushParams;
use tokio_util::sync::CancellationToken;

/// A message delivered to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedMessage {
    pub id: String,
    pub publish_time: DateTime<Utc>,
    /// 1 on the first attempt.
    pub delivery_attempt: u32,
    pub attributes: BTreeMap<String, String>,
    /// The raw payload as published.
    pub data: Bytes,
}

impl From<SubscriptionPushParams> for PushedMessage {
    fn from(params: SubscriptionPushParams) -> Self {
        Self {
            id: params.message_id,
            publish_time: params.publish_time,
            delivery_attempt: params.delivery_attempt,
            attributes: params.attributes,
            data: Bytes::from(params.data),
        }
    }
}

/// Handles messages pushed to a subscription.
///
/// Returning `Ok` acks the message; returning an error nacks it with the
/// error's text, and the control plane will redeliver. `cancel` fires if
/// the control plane hangs up before the callback finishes; whatever the
/// callback returns after that is discarded.
///
/// Implemented for any `Fn(CancellationToken, PushedMessage) -> impl Future`
/// returning `anyhow::Result<()>`:
///
/// ```rust,no_run
/// use cloudpush_push::{PushedMessage, SubscriptionCallback};
/// use tokio_util::sync::CancellationToken;
///
/// fn callback() -> impl SubscriptionCallback {
///     |_cancel: CancellationToken, message: PushedMessage| async move {
///         println!("got {}", message.id);
///         anyhow::Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait SubscriptionCallback: Send + Sync {
    async fn handle(&self, cancel: CancellationToken, message: PushedMessage) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> SubscriptionCallback for F
where
    F: Fn(CancellationToken, PushedMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, cancel: CancellationToken, message: PushedMessage) -> anyhow::Result<()> {
        (self)(cancel, message).await
    }
}
