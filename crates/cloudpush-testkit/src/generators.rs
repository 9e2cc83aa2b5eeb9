//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use cloudpush_auth::{ActionType, Key, ObjectType};
use cloudpush_client::{PublishParams, SubscriptionPushParams};

/// Generate a key with an arbitrary id and secret.
pub fn key() -> impl Strategy<Value = Key> {
    (any::<u32>(), prop::collection::vec(any::<u8>(), 0..=64))
        .prop_map(|(id, secret)| Key::new(id, secret))
}

/// Generate an app slug or environment name.
pub fn identity() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,31}".prop_map(String::from)
}

/// Generate a whole-second timestamp between 1970 and 2100.
pub fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..=4_102_444_800i64).prop_filter_map("timestamp out of range", |secs| {
        DateTime::from_timestamp(secs, 0)
    })
}

pub fn object_type() -> impl Strategy<Value = ObjectType> {
    Just(ObjectType::PubsubMsg)
}

pub fn action_type() -> impl Strategy<Value = ActionType> {
    prop_oneof![Just(ActionType::Create), Just(ActionType::Read)]
}

/// Generate up to four context blobs.
pub fn context() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..=16), 0..=4)
}

/// Generate message attributes.
pub fn attributes() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,8}", "[ -~]{0,16}", 0..=4)
}

/// Generate a flat JSON object payload.
pub fn json_payload() -> impl Strategy<Value = serde_json::Value> {
    prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..=6).prop_map(|fields| {
        serde_json::Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::from(v)))
                .collect(),
        )
    })
}

pub fn publish_params() -> impl Strategy<Value = PublishParams> {
    (attributes(), json_payload())
        .prop_map(|(attributes, payload)| PublishParams { attributes, payload })
}

pub fn push_params() -> impl Strategy<Value = SubscriptionPushParams> {
    (
        prop::collection::vec(any::<u8>(), 0..=128),
        attributes(),
        "[a-z0-9-]{1,24}",
        timestamp(),
        1u32..=100,
    )
        .prop_map(
            |(data, attributes, message_id, publish_time, delivery_attempt)| {
                SubscriptionPushParams {
                    data,
                    attributes,
                    message_id,
                    publish_time,
                    delivery_attempt,
                }
            },
        )
}

/// Everything needed to sign one request.
#[derive(Debug, Clone)]
pub struct SigningParams {
    pub key: Key,
    pub app_slug: String,
    pub env_name: String,
    pub timestamp: DateTime<Utc>,
    pub object: ObjectType,
    pub action: ActionType,
    pub payload: Vec<u8>,
    pub context: Vec<Vec<u8>>,
}

impl SigningParams {
    pub fn context_refs(&self) -> Vec<&[u8]> {
        self.context.iter().map(Vec::as_slice).collect()
    }
}

impl Arbitrary for SigningParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            key(),
            identity(),
            identity(),
            timestamp(),
            object_type(),
            action_type(),
            prop::collection::vec(any::<u8>(), 0..=256),
            context(),
        )
            .prop_map(
                |(key, app_slug, env_name, timestamp, object, action, payload, context)| {
                    SigningParams {
                        key,
                        app_slug,
                        env_name,
                        timestamp,
                        object,
                        action,
                        payload,
                        context,
                    }
                },
            )
            .boxed()
    }
}
