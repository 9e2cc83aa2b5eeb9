//! Request verification: headers in, trusted operation hash out.

use chrono::{DateTime, Duration, Utc};

use crate::error::{AuthError, Result};
use crate::hash::OperationHash;
use crate::headers::Headers;
use crate::key::KeyRegistry;
use crate::sign::sign_at;

/// How far, in seconds, the signing time may drift from the verifier's
/// clock, either way.
pub const ALLOWED_CLOCK_SKEW_SECS: i64 = 2 * 60;

/// Verify a request's authentication headers.
///
/// On success returns the operation hash the peer signed. That hash is only
/// a claim about the body: the caller must hash the payload it actually
/// decoded and compare before trusting it (see [`OperationHash::verify`]).
///
/// Checks, in order:
/// 1. headers present and well formed
/// 2. signing time within [`ALLOWED_CLOCK_SKEW_SECS`] of `now`
/// 3. key id known
/// 4. headers match a fresh signature in constant time
pub fn verify(headers: &Headers, keys: &KeyRegistry, now: DateTime<Utc>) -> Result<OperationHash> {
    if headers.authorization.is_empty() && headers.date.is_empty() {
        return Err(AuthError::NoAuthorizationHeader);
    }

    let components = headers.signing_components()?;

    // Cheap check first: no MAC work for stale or future-dated requests.
    let window = Duration::seconds(ALLOWED_CLOCK_SKEW_SECS);
    let skew = now - components.timestamp;
    if skew > window || skew < -window {
        return Err(AuthError::AuthenticationExpired);
    }

    let key = keys
        .get(components.key_id)
        .ok_or(AuthError::AuthenticationFailed)?;

    let expected = sign_at(
        key,
        &components.app_slug,
        &components.env_name,
        components.timestamp,
        &components.operation_hash,
    );

    if !expected.ct_eq(headers) {
        return Err(AuthError::AuthenticationFailed);
    }

    Ok(components.operation_hash)
}
