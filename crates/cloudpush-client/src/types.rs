//! Wire types exchanged with the control plane.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cloudpush_auth::{canonical_json, Payload};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Body of a publish request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishParams {
    /// Optional message attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// The message payload, passed through untouched.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl PublishParams {
    pub fn validate(&self) -> Result<()> {
        if self.payload.is_null() {
            return Err(ClientError::Validation("payload must be provided".into()));
        }
        Ok(())
    }
}

impl Payload for PublishParams {
    fn deterministic_bytes(&self) -> cloudpush_auth::Result<Vec<u8>> {
        canonical_json(self)
    }
}

/// Response to a publish request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub message_id: String,
}

/// Body the control plane POSTs to a subscription's push endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPushParams {
    #[serde(with = "cloudpush_auth::canonical::base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    pub message_id: String,
    pub publish_time: DateTime<Utc>,
    pub delivery_attempt: u32,
}

impl Payload for SubscriptionPushParams {
    fn deterministic_bytes(&self) -> cloudpush_auth::Result<Vec<u8>> {
        canonical_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn push() -> SubscriptionPushParams {
        SubscriptionPushParams {
            data: br#"{"id":7}"#.to_vec(),
            attributes: BTreeMap::new(),
            message_id: "m-1".into(),
            publish_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            delivery_attempt: 1,
        }
    }

    #[test]
    fn test_publish_params_shape() {
        let params = PublishParams {
            attributes: BTreeMap::new(),
            payload: json!({"id": 7}),
        };
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"payload":{"id":7}}"#
        );

        let mut with_attrs = params.clone();
        with_attrs.attributes.insert("k".into(), "v".into());
        assert_eq!(
            serde_json::to_value(&with_attrs).unwrap(),
            json!({"attributes": {"k": "v"}, "payload": {"id": 7}})
        );
    }

    #[test]
    fn test_publish_params_validate() {
        let missing: PublishParams = serde_json::from_str("{}").unwrap();
        assert!(matches!(missing.validate(), Err(ClientError::Validation(_))));

        let present: PublishParams = serde_json::from_str(r#"{"payload":{"id":7}}"#).unwrap();
        present.validate().unwrap();
    }

    #[test]
    fn test_push_params_wire_form() {
        let value = serde_json::to_value(push()).unwrap();
        assert_eq!(
            value,
            json!({
                "data": "eyJpZCI6N30=",
                "message_id": "m-1",
                "publish_time": "2024-03-01T12:00:00Z",
                "delivery_attempt": 1,
            })
        );
    }

    #[test]
    fn test_push_params_rejects_bad_base64() {
        let body = r#"{"data":"not base64!","message_id":"m","publish_time":"2024-03-01T12:00:00Z","delivery_attempt":1}"#;
        assert!(serde_json::from_str::<SubscriptionPushParams>(body).is_err());
    }

    #[test]
    fn test_decoded_push_rehashes_identically() {
        // The receiver hashes what it decoded, not the bytes it received.
        let sent = push().deterministic_bytes().unwrap();
        let body = r#"{
            "delivery_attempt": 1,
            "publish_time": "2024-03-01T12:00:00+00:00",
            "message_id": "m-1",
            "data": "eyJpZCI6N30="
        }"#;
        let decoded: SubscriptionPushParams = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.deterministic_bytes().unwrap(), sent);
    }
}
