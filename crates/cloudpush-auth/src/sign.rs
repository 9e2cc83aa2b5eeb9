//! Producing authentication headers.

use chrono::{DateTime, SubsecRound, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::clock::Clock;
use crate::hash::OperationHash;
use crate::headers::{credential_string, format_http_date, Headers, AUTH_SCHEME};
use crate::key::Key;

type HmacSha256 = Hmac<Sha256>;

/// Sign an operation as `app_slug`/`env_name` at the clock's current time.
pub fn sign(
    key: &Key,
    app_slug: &str,
    env_name: &str,
    clock: &dyn Clock,
    operation_hash: &OperationHash,
) -> Headers {
    sign_at(key, app_slug, env_name, clock.now(), operation_hash)
}

/// Sign an operation at an explicit timestamp.
///
/// The timestamp is truncated to whole seconds, the resolution of the Date
/// header, so re-signing the parsed components of a request reproduces its
/// headers byte for byte. The verifier relies on this.
pub fn sign_at(
    key: &Key,
    app_slug: &str,
    env_name: &str,
    timestamp: DateTime<Utc>,
    operation_hash: &OperationHash,
) -> Headers {
    let timestamp = timestamp.trunc_subsecs(0);
    let date = format_http_date(&timestamp);
    let credential = credential_string(&timestamp, app_slug, env_name, key.id);

    let signature = compute_signature(key, &date, &credential, operation_hash);

    Headers {
        authorization: format!(
            "{AUTH_SCHEME} cred=\"{credential}\", op={operation_hash}, sig={signature}"
        ),
        date,
    }
}

/// HMAC-SHA256 over the string to sign, hex encoded.
fn compute_signature(
    key: &Key,
    date: &str,
    credential: &str,
    operation_hash: &OperationHash,
) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key.secret()).expect("HMAC can take key of any size");
    mac.update(string_to_sign(date, credential, operation_hash).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// The canonical string covered by the signature.
fn string_to_sign(date: &str, credential: &str, operation_hash: &OperationHash) -> String {
    format!("{AUTH_SCHEME}\n{date}\n{credential}\n{operation_hash}")
}
