//! # cloudpush client
//!
//! The raw client used by the SDK to talk to the cloudpush control plane.
//!
//! Outgoing requests are signed with the newest configured key; incoming
//! requests are verified against all of them and their bodies re-hashed
//! before they are handed out.
//!
//! ```text
//! app                                         control plane
//!  | signed_post(/v1/pubsub/{topic}/publish) ->|
//!  |<------------------ {"message_id": ...} ---|
//!  |                                            |
//!  |<- push {data, message_id, ...} (signed) ---|
//!  | verify_and_decode                          |
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{Client, USER_AGENT};
pub use config::{ClientConfig, DEFAULT_HOST};
pub use error::{ClientError, Result};
pub use transport::{
    memory::MemoryTransport, HttpTransport, SignedRequest, Transport, TransportResponse,
};
pub use types::{PublishParams, PublishResponse, SubscriptionPushParams};
