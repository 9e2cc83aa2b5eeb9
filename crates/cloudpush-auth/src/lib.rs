//! # cloudpush auth
//!
//! Symmetric-key request signing for traffic between an application and the
//! cloudpush control plane.
//!
//! This crate contains no I/O. It turns an operation into a pair of HTTP
//! headers and back.
//!
//! ## Key Types
//!
//! - [`Key`] / [`KeyRegistry`] - versioned MAC keys; the newest signs, all verify
//! - [`OperationHash`] - domain-separated fingerprint of (object, action, payload, context)
//! - [`Headers`] - the `Authorization` and `Date` values carried on the wire
//! - [`Clock`] - injectable time source
//!
//! ## Flow
//!
//! ```text
//! sender                                   receiver
//!   hash = OperationHash::new(..)
//!   headers = sign(key, app, env, clock, hash)
//!   ----------- Authorization, Date, body ----------->
//!                                          claimed = verify(headers, keys, now)?
//!                                          claimed.verify(.., decoded body, ..)?
//! ```
//!
//! A verified header only proves the peer signed *some* operation hash. The
//! receiver must re-hash the body it decoded and compare.

pub mod canonical;
pub mod clock;
pub mod error;
pub mod hash;
pub mod headers;
pub mod key;
pub mod sign;
pub mod verify;

pub use canonical::{canonical_json, BytesPayload, JsonPayload, Payload};
pub use clock::{Clock, MockClock, SystemClock};
pub use error::{AuthError, Result};
pub use hash::{ActionType, ObjectType, OperationHash};
pub use headers::{format_http_date, parse_http_date, Headers, SigningComponents, AUTH_SCHEME};
pub use key::{Key, KeyRegistry};
pub use sign::{sign, sign_at};
pub use verify::{verify, ALLOWED_CLOCK_SKEW_SECS};
