//! Test fixtures and helpers.
//!
//! Common setup code for tests on both sides of the wire: the app (which
//! needs a [`ClientConfig`]) and the control plane (which signs pushes and
//! verifies publishes).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use cloudpush_auth::{
    sign, ActionType, Clock, Headers, Key, KeyRegistry, MockClock, ObjectType, OperationHash,
    Payload,
};
use cloudpush_client::{ClientConfig, PublishParams, SubscriptionPushParams};

pub const FIXTURE_KEY_ID: u32 = 1;
pub const FIXTURE_SECRET: &[u8] = b"s3cr3t";
pub const FIXTURE_APP: &str = "my-app";
pub const FIXTURE_ENV: &str = "prod";

/// A fixed key, identity and mock clock shared by both peers of a test.
pub struct TestFixture {
    pub key: Key,
    pub keys: KeyRegistry,
    pub clock: MockClock,
    pub app_slug: String,
    pub env_name: String,
}

impl TestFixture {
    /// Key 1 with secret `s3cr3t`, app `my-app`, env `prod`, clock at
    /// 2024-03-01T12:00:00Z.
    pub fn new() -> Self {
        Self::with_key(Key::new(FIXTURE_KEY_ID, FIXTURE_SECRET.to_vec()))
    }

    pub fn with_key(key: Key) -> Self {
        Self {
            keys: KeyRegistry::single(key.clone()),
            key,
            clock: MockClock::new(fixture_time()),
            app_slug: FIXTURE_APP.to_string(),
            env_name: FIXTURE_ENV.to_string(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Client configuration for the app side, sharing this fixture's clock.
    pub fn client_config(&self, host: &str) -> ClientConfig {
        ClientConfig {
            host: host.to_string(),
            app_slug: self.app_slug.clone(),
            env_name: self.env_name.clone(),
            keys: self.keys.clone(),
            clock: Arc::new(self.clock.clone()),
        }
    }

    /// Sign an arbitrary operation as this fixture's identity.
    pub fn sign(
        &self,
        object: ObjectType,
        action: ActionType,
        payload: &dyn Payload,
        context: &[&[u8]],
    ) -> Headers {
        let op = OperationHash::new(object, action, payload, context)
            .expect("fixture payloads always encode");
        sign(&self.key, &self.app_slug, &self.env_name, &self.clock, &op)
    }

    /// Sign a push of `params` to `subscription_id`, as the control plane does.
    pub fn sign_push(&self, subscription_id: &str, params: &SubscriptionPushParams) -> Headers {
        self.sign(
            ObjectType::PubsubMsg,
            ActionType::Read,
            params,
            &[subscription_id.as_bytes()],
        )
    }

    /// Sign a publish of `params` to `topic_id`, as the app does.
    pub fn sign_publish(&self, topic_id: &str, params: &PublishParams) -> Headers {
        self.sign(
            ObjectType::PubsubMsg,
            ActionType::Create,
            params,
            &[topic_id.as_bytes()],
        )
    }

    /// A first-attempt push body published at the fixture's current time.
    pub fn push_params(&self, message_id: &str, data: &[u8]) -> SubscriptionPushParams {
        SubscriptionPushParams {
            data: data.to_vec(),
            attributes: BTreeMap::new(),
            message_id: message_id.to_string(),
            publish_time: self.now(),
            delivery_attempt: 1,
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}
