//! SDK construction.

use std::sync::Arc;

use cloudpush_auth::{Clock, Key, KeyRegistry};
use cloudpush_client::{Client, ClientConfig, HttpTransport, Transport};
use cloudpush_push::PushConfig;
use tracing::debug;

use crate::error::Result;
use crate::pubsub::CloudClient;

/// The cloudpush SDK.
#[derive(Debug, Clone)]
pub struct Sdk {
    cloud: CloudClient,
}

impl Sdk {
    pub fn builder() -> SdkBuilder {
        SdkBuilder::new()
    }

    /// Pub/sub on the control plane.
    pub fn cloud(&self) -> &CloudClient {
        &self.cloud
    }
}

/// Builds an [`Sdk`].
///
/// ```rust,no_run
/// use cloudpush::{Key, Sdk};
///
/// let sdk = Sdk::builder()
///     .app_details("my-app", "prod")
///     .auth_keys([Key::new(1, b"s3cr3t".to_vec())])
///     .build()
///     .unwrap();
/// ```
pub struct SdkBuilder {
    config: ClientConfig,
    keys: Vec<Key>,
    push: PushConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl SdkBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            keys: Vec::new(),
            push: PushConfig::default(),
            transport: None,
        }
    }

    /// Base URL of the control plane.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// The application and environment this SDK runs as.
    pub fn app_details(mut self, app_slug: impl Into<String>, env_name: impl Into<String>) -> Self {
        self.config.app_slug = app_slug.into();
        self.config.env_name = env_name.into();
        self
    }

    /// All live auth keys. The one with the highest id signs.
    pub fn auth_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.config.clock = Arc::new(clock);
        self
    }

    pub fn push_config(mut self, push: PushConfig) -> Self {
        self.push = push;
        self
    }

    /// Send requests through `transport` instead of HTTP.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Sdk> {
        let mut config = self.config;
        config.keys = KeyRegistry::new(self.keys)?;

        debug!(?config, "building sdk");
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new()));
        let client = Client::with_transport(config, transport)?;

        Ok(Sdk {
            cloud: CloudClient::new(client, self.push),
        })
    }
}

impl Default for SdkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use cloudpush_auth::{AuthError, MockClock};
    use cloudpush_client::{ClientError, MemoryTransport};
    use std::collections::BTreeMap;

    fn builder() -> SdkBuilder {
        Sdk::builder()
            .app_details("my-app", "prod")
            .auth_keys([Key::new(1, b"s3cr3t".to_vec())])
    }

    #[test]
    fn test_build() {
        let sdk = builder().host("http://127.0.0.1:9000").build().unwrap();
        let config = sdk.cloud().client().config();
        assert_eq!(config.host, "http://127.0.0.1:9000");
        assert_eq!(config.app_slug, "my-app");
        assert_eq!(config.keys.latest().map(|k| k.id), Some(1));
    }

    #[test]
    fn test_latest_key_signs() {
        let sdk = builder()
            .auth_keys([
                Key::new(3, b"c".to_vec()),
                Key::new(7, b"b".to_vec()),
                Key::new(5, b"a".to_vec()),
            ])
            .build()
            .unwrap();
        assert_eq!(sdk.cloud().client().config().keys.latest().map(|k| k.id), Some(7));
    }

    #[test]
    fn test_build_errors() {
        let duplicate = builder()
            .auth_keys([Key::new(1, b"a".to_vec()), Key::new(1, b"b".to_vec())])
            .build()
            .unwrap_err();
        assert!(matches!(duplicate, SdkError::Auth(AuthError::DuplicateKeyId(1))));

        let no_keys = builder().auth_keys([]).build().unwrap_err();
        assert!(matches!(no_keys, SdkError::Client(ClientError::Config(_))));

        let no_app = Sdk::builder()
            .auth_keys([Key::new(1, b"a".to_vec())])
            .build()
            .unwrap_err();
        assert!(matches!(no_app, SdkError::Client(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_publish_through_transport() {
        let transport = Arc::new(MemoryTransport::new());
        transport.respond_with(200, r#"{"message_id":"m-1"}"#).await;
        let sdk = builder()
            .clock(MockClock::default())
            .transport(transport.clone())
            .build()
            .unwrap();

        let id = sdk
            .cloud()
            .publish_to_topic("orders", BTreeMap::new(), serde_json::json!({"id": 7}))
            .await
            .unwrap();
        assert_eq!(id, "m-1");

        let requests = transport.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/v1/pubsub/orders/publish");
    }

    #[tokio::test]
    async fn test_publish_validation() {
        let transport = Arc::new(MemoryTransport::new());
        let sdk = builder().transport(transport.clone()).build().unwrap();

        let err = sdk
            .cloud()
            .publish_to_topic("orders", BTreeMap::new(), serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Client(ClientError::Validation(_))));

        let err = sdk
            .cloud()
            .publish_to_topic("", BTreeMap::new(), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Client(ClientError::Validation(_))));

        assert!(transport.requests().await.is_empty());
    }
}
