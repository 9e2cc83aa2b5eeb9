//! # cloudpush push
//!
//! Receiving subscription messages pushed by the cloudpush control plane.
//!
//! The control plane POSTs a signed message and keeps the request open. The
//! handler verifies it, answers `200 OK` with an event stream straight away,
//! runs the subscription callback in its own task and reports on the stream:
//!
//! ```text
//! control plane                          app
//!   |-------- POST (signed) ----------->|  verify, decode, re-hash
//!   |<------- 200 text/event-stream ----|  callback spawned
//!   |<------- event: keepalive ---------|  every 5s while it runs
//!   |<------- event: ack | nack --------|  exactly once
//!   |-------- close ------------------->|
//! ```
//!
//! If the control plane hangs up first the callback's cancellation token
//! fires and nothing terminal is written; the message will be redelivered.

pub mod callback;
pub mod config;
pub mod delivery;
pub mod envelope;
pub mod error;
pub mod event;
pub mod handler;

pub use callback::{PushedMessage, SubscriptionCallback};
pub use config::{PushConfig, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_KEEPALIVE_INTERVAL};
pub use delivery::{Delivery, DeliveryOutcome, DeliveryReport, DeliveryState};
pub use envelope::{envelope_response, ok_response, ErrorEnvelope};
pub use error::{PushError, Result};
pub use event::SseEvent;
pub use handler::{
    SubscriptionHandler, PUSH_ACCEPT_VERSION_HEADER, PUSH_VERSION, PUSH_VERSION_HEADER,
};
