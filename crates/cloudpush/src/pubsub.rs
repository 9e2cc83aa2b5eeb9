//! Pub/sub on the cloudpush control plane.

use std::collections::BTreeMap;

use axum::Router;
use cloudpush_auth::{ActionType, ObjectType};
use cloudpush_client::{Client, ClientError, PublishParams, PublishResponse};
use cloudpush_push::{PushConfig, SubscriptionCallback, SubscriptionHandler};
use tracing::debug;

use crate::error::Result;

/// Publishes to topics and receives pushes for subscriptions.
#[derive(Debug, Clone)]
pub struct CloudClient {
    client: Client,
    push: PushConfig,
}

impl CloudClient {
    pub fn new(client: Client, push: PushConfig) -> Self {
        Self { client, push }
    }

    /// The underlying signed client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Publish a message to `topic_id`.
    ///
    /// Returns the id the message broker assigned to it.
    pub async fn publish_to_topic(
        &self,
        topic_id: &str,
        attributes: BTreeMap<String, String>,
        payload: serde_json::Value,
    ) -> Result<String> {
        if topic_id.is_empty() {
            return Err(ClientError::Validation("topic id must be provided".into()).into());
        }
        let params = PublishParams {
            attributes,
            payload,
        };
        params.validate()?;

        let response: PublishResponse = self
            .client
            .signed_post(
                &["v1", "pubsub", topic_id, "publish"],
                ObjectType::PubsubMsg,
                ActionType::Create,
                &params,
                &[topic_id.as_bytes()],
            )
            .await?;

        debug!(topic_id, message_id = %response.message_id, "published message");
        Ok(response.message_id)
    }

    /// A handler for pushes to `subscription_id`.
    ///
    /// The control plane signs each push for exactly one subscription; a push
    /// signed for another subscription is rejected with 401.
    pub fn subscription_handler(
        &self,
        subscription_id: impl Into<String>,
        callback: impl SubscriptionCallback + 'static,
    ) -> SubscriptionHandler {
        SubscriptionHandler::new(
            self.client.clone(),
            subscription_id,
            callback,
            self.push.clone(),
        )
    }

    /// A router serving the handler for `subscription_id` at `path`.
    ///
    /// Merge it into the application's router.
    pub fn subscription_router(
        &self,
        path: &str,
        subscription_id: impl Into<String>,
        callback: impl SubscriptionCallback + 'static,
    ) -> Router {
        self.subscription_handler(subscription_id, callback)
            .into_router(path)
    }
}
