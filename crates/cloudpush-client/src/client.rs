//! The raw signed client.

use std::sync::Arc;

use cloudpush_auth::{
    sign, verify, ActionType, AuthError, BytesPayload, Headers, ObjectType, OperationHash,
    Payload,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::{HttpTransport, SignedRequest, Transport};

/// Sent as `User-Agent` on every request.
pub const USER_AGENT: &str = concat!("cloudpush-sdk/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body kept in [`ClientError::UnexpectedStatus`].
const MAX_ERROR_BODY: usize = 512;

/// Signs requests to the control plane and verifies requests from it.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client that talks HTTP.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// POST a signed JSON body to `path` under the host and decode the JSON
    /// response.
    ///
    /// The signature covers `object`, `action`, the body and every `context`
    /// blob, in that order.
    pub async fn signed_post<R: DeserializeOwned>(
        &self,
        path: &[&str],
        object: ObjectType,
        action: ActionType,
        body: &dyn Payload,
        context: &[&[u8]],
    ) -> Result<R> {
        // Send exactly the bytes that were hashed.
        let body = BytesPayload(body.deterministic_bytes()?);
        let operation_hash = OperationHash::new(object, action, &body, context)?;

        let key = self
            .config
            .keys
            .latest()
            .ok_or_else(|| ClientError::Config("no auth key to sign with".into()))?;
        let auth = sign(
            key,
            &self.config.app_slug,
            &self.config.env_name,
            self.config.clock.as_ref(),
            &operation_hash,
        );

        let url = self.config.endpoint(path)?;
        debug!(%url, key_id = key.id, op = ?operation_hash, "sending signed request");

        let request = SignedRequest {
            url,
            headers: vec![
                ("User-Agent", USER_AGENT.to_string()),
                ("Content-Type", "application/json".to_string()),
                ("Accept", "application/json".to_string()),
                ("Cache-Control", "no-cache".to_string()),
                ("Connection", "keep-alive".to_string()),
                ("Authorization", auth.authorization),
                ("Date", auth.date),
            ],
            body: body.0,
        };

        let response = self.transport.post(request).await?;
        if response.status != 200 {
            let body = String::from_utf8_lossy(&response.body);
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!(status = response.status, "control plane rejected request");
            return Err(ClientError::UnexpectedStatus {
                status: response.status,
                body,
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|err| ClientError::Decode(format!("response body: {err}")))
    }

    /// Verify a request signed by the control plane and decode its JSON body.
    ///
    /// The headers are checked first. The body is then decoded, re-hashed
    /// with `object`, `action` and `context`, and compared against the hash
    /// the headers carried. Only a body that matches is returned.
    pub fn verify_and_decode<T: DeserializeOwned + Payload>(
        &self,
        headers: &Headers,
        body: &[u8],
        object: ObjectType,
        action: ActionType,
        context: &[&[u8]],
    ) -> Result<T> {
        let claimed = verify(headers, &self.config.keys, self.config.clock.now())?;

        let decoded: T = serde_json::from_slice(body)
            .map_err(|err| ClientError::Decode(format!("request body: {err}")))?;

        if !claimed.verify(object, action, &decoded, context)? {
            return Err(AuthError::AuthenticationFailed.into());
        }

        Ok(decoded)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
