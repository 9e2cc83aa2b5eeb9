//! # cloudpush
//!
//! SDK for apps on the cloudpush control plane: publish messages to topics
//! and receive pushed subscription messages over a signed, acknowledged
//! stream.
//!
//! ## Overview
//!
//! - **Signing**: every request either way carries an HMAC over a hash of
//!   the operation, made with a shared key. Keys rotate by id; the newest
//!   signs and all are accepted.
//! - **Publishing**: [`CloudClient::publish_to_topic`] signs and POSTs a
//!   message and returns the broker's message id.
//! - **Push delivery**: [`CloudClient::subscription_router`] mounts a handler
//!   that verifies each pushed message, runs your callback and streams
//!   keepalives until it answers `ack` or `nack`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//!
//! use cloudpush::{Key, PushedMessage, Sdk};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let sdk = Sdk::builder()
//!         .app_details("my-app", "prod")
//!         .auth_keys([Key::new(1, b"s3cr3t".to_vec())])
//!         .build()?;
//!
//!     let id = sdk
//!         .cloud()
//!         .publish_to_topic("orders", BTreeMap::new(), serde_json::json!({"id": 7}))
//!         .await?;
//!     println!("published {id}");
//!
//!     let app = sdk.cloud().subscription_router(
//!         "/push/orders",
//!         "orders-worker",
//!         |_cancel: CancellationToken, message: PushedMessage| async move {
//!             println!("got {}", message.id);
//!             anyhow::Ok(())
//!         },
//!     );
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `cloudpush::auth` - Keys, signing and verification
//! - `cloudpush::client` - Signed HTTP client and wire types
//! - `cloudpush::push` - Push subscription handler

pub mod error;
pub mod pubsub;
pub mod sdk;

pub use cloudpush_auth as auth;
pub use cloudpush_client as client;
pub use cloudpush_push as push;

pub use cloudpush_auth::{Clock, Key, KeyRegistry, MockClock, SystemClock};
pub use cloudpush_client::{PublishParams, SubscriptionPushParams, DEFAULT_HOST};
pub use cloudpush_push::{
    PushConfig, PushError, PushedMessage, SubscriptionCallback, SubscriptionHandler,
};
pub use error::{Result, SdkError};
pub use pubsub::CloudClient;
pub use sdk::{Sdk, SdkBuilder};
