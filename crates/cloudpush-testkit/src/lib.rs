//! # cloudpush testkit
//!
//! Testing utilities for cloudpush.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed key, identity, time and operation hash with the
//!   exact headers they must sign to
//! - **Generators**: proptest strategies for keys, identities, payloads
//! - **Fixtures**: a fixed key and mock clock that can sign like the control
//!   plane does
//!
//! ## Golden Vectors
//!
//! ```rust
//! use cloudpush_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, authorization) in verify_all_vectors() {
//!     assert!(matches, "{name}: {authorization}");
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use cloudpush_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let params = fixture.push_params("m-1", br#"{"id":7}"#);
//! let headers = fixture.sign_push("sub-1", &params);
//! assert!(headers.authorization.starts_with("CLOUDPUSH1-HMAC-SHA256 "));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::TestFixture;
pub use generators::SigningParams;
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
