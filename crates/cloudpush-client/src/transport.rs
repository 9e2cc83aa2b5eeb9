//! Transport abstraction for signed requests.
//!
//! The client builds and signs a request; a transport only moves bytes.
//! [`HttpTransport`] goes over the network, [`memory::MemoryTransport`]
//! records requests and replays canned responses for tests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use crate::error::Result;

/// A fully signed request, ready to send.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl SignedRequest {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Moves signed requests to the control plane.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST the request and return whatever the peer answered, whatever the
    /// status. Only failures to deliver or read are errors.
    async fn post(&self, request: SignedRequest) -> Result<TransportResponse>;
}

/// Transport over HTTP(S) using `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured `reqwest` client (proxies, timeouts, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: SignedRequest) -> Result<TransportResponse> {
        let mut builder = self.client.post(request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.body(request.body).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(TransportResponse { status, body })
    }
}

/// A simple in-memory transport for testing.
pub mod memory {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    use crate::error::ClientError;

    /// Records every request and answers from a queue of canned responses.
    #[derive(Debug, Default)]
    pub struct MemoryTransport {
        requests: Mutex<Vec<SignedRequest>>,
        responses: Mutex<VecDeque<TransportResponse>>,
    }

    impl MemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the next request.
        pub async fn respond_with(&self, status: u16, body: impl Into<Bytes>) {
            self.responses.lock().await.push_back(TransportResponse {
                status,
                body: body.into(),
            });
        }

        /// Every request sent so far, oldest first.
        pub async fn requests(&self) -> Vec<SignedRequest> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn post(&self, request: SignedRequest) -> Result<TransportResponse> {
            self.requests.lock().await.push(request);
            self.responses
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| ClientError::Transport("no response queued".into()))
        }
    }
}
