//! The two authentication headers and their wire grammar.
//!
//! ```text
//! Authorization: CLOUDPUSH1-HMAC-SHA256 cred="<YYYYMMDD>/<app>/<env>/<kid>", op=<hash>, sig=<hex>
//! Date:          Sun, 06 Nov 1994 08:49:37 GMT
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::{AuthError, Result};
use crate::hash::OperationHash;

/// Scheme token that starts every Authorization value.
pub const AUTH_SCHEME: &str = "CLOUDPUSH1-HMAC-SHA256";

/// IMF-fixdate, the preferred HTTP date format.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Obsolete RFC 850 date format, accepted on input.
const RFC850_DATE_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT";
/// ANSI C asctime() format, accepted on input.
const ASCTIME_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Calendar-day stamp embedded in the credential string.
const CREDENTIAL_DATE_FORMAT: &str = "%Y%m%d";

/// The headers used to authenticate a request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    pub authorization: String,
    pub date: String,
}

/// Everything the Authorization and Date headers claim about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningComponents {
    pub key_id: u32,
    pub app_slug: String,
    pub env_name: String,
    pub timestamp: DateTime<Utc>,
    pub operation_hash: OperationHash,
}

impl Headers {
    pub fn new(authorization: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            authorization: authorization.into(),
            date: date.into(),
        }
    }

    /// Compare both headers in constant time.
    ///
    /// Both comparisons always run, so the timing does not reveal which
    /// header differed.
    pub fn ct_eq(&self, other: &Headers) -> bool {
        let auth_matches = self
            .authorization
            .as_bytes()
            .ct_eq(other.authorization.as_bytes());
        let date_matches = self.date.as_bytes().ct_eq(other.date.as_bytes());
        (auth_matches & date_matches).into()
    }

    /// Parse the signing components out of the headers.
    ///
    /// This checks the grammar only. It does not look at the signature or
    /// the clock.
    pub fn signing_components(&self) -> Result<SigningComponents> {
        if self.authorization.is_empty() {
            return Err(AuthError::NoAuthorizationHeader);
        }
        if self.date.is_empty() {
            return Err(AuthError::NoDateHeader);
        }

        let timestamp = parse_http_date(&self.date).ok_or(AuthError::NoDateHeader)?;

        let (scheme, parameters) = self
            .authorization
            .split_once(' ')
            .ok_or_else(|| invalid("unable to find scheme"))?;
        if scheme != AUTH_SCHEME {
            return Err(invalid("unknown scheme"));
        }

        let parameters: Vec<&str> = parameters.split(", ").collect();
        if parameters.len() != 3 {
            return Err(invalid("expected 3 parameters"));
        }

        let mut credential: Option<Credential> = None;
        let mut operation_hash: Option<OperationHash> = None;
        let mut signature_seen = false;

        for parameter in parameters {
            let (name, value) = parameter
                .split_once('=')
                .ok_or_else(|| invalid("unable to find parameter name"))?;

            match name {
                "cred" if credential.is_none() => {
                    let value = unquote(value)
                        .ok_or_else(|| invalid("unable to unquote credential string"))?;
                    let cred = Credential::parse(value)?;
                    if cred.date != credential_date(&timestamp) {
                        return Err(invalid("dates don't align"));
                    }
                    credential = Some(cred);
                }
                "op" if operation_hash.is_none() => {
                    operation_hash = Some(OperationHash::from_wire(value));
                }
                "sig" if !signature_seen => {
                    signature_seen = true;
                }
                "cred" | "op" | "sig" => {
                    return Err(invalid(format!("duplicate parameter {name:?}")));
                }
                _ => return Err(invalid(format!("unknown parameter {name:?}"))),
            }
        }

        // Three parameters with no duplicates means all three are present.
        let (Some(credential), Some(operation_hash)) = (credential, operation_hash) else {
            return Err(invalid("missing parameter"));
        };

        Ok(SigningComponents {
            key_id: credential.key_id,
            app_slug: credential.app_slug,
            env_name: credential.env_name,
            timestamp,
            operation_hash,
        })
    }
}

impl std::fmt::Debug for Headers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The signature is a bearer credential for the next two minutes.
        let authorization = match self.authorization.rfind("sig=") {
            Some(idx) => format!("{}sig=<redacted>", &self.authorization[..idx]),
            None => self.authorization.clone(),
        };
        f.debug_struct("Headers")
            .field("authorization", &authorization)
            .field("date", &self.date)
            .finish()
    }
}

/// The parsed `cred="..."` value.
struct Credential {
    date: String,
    app_slug: String,
    env_name: String,
    key_id: u32,
}

impl Credential {
    fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split('/').collect();
        let [date, app_slug, env_name, key_id] = parts.as_slice() else {
            return Err(invalid("invalid credential string"));
        };

        if key_id.is_empty() || !key_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("invalid credential string: invalid key id"));
        }
        let key_id: u32 = key_id
            .parse()
            .map_err(|_| invalid("invalid credential string: invalid key id"))?;

        Ok(Self {
            date: date.to_string(),
            app_slug: app_slug.to_string(),
            env_name: env_name.to_string(),
            key_id,
        })
    }
}

/// Render the credential string `<YYYYMMDD>/<app>/<env>/<kid>`.
pub(crate) fn credential_string(
    timestamp: &DateTime<Utc>,
    app_slug: &str,
    env_name: &str,
    key_id: u32,
) -> String {
    format!(
        "{}/{}/{}/{}",
        credential_date(timestamp),
        app_slug,
        env_name,
        key_id
    )
}

fn credential_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(CREDENTIAL_DATE_FORMAT).to_string()
}

/// Format a timestamp as an IMF-fixdate HTTP date.
pub fn format_http_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date in any of the three formats RFC 9110 allows.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    [HTTP_DATE_FORMAT, RFC850_DATE_FORMAT, ASCTIME_DATE_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Strip surrounding double quotes. Escapes are never produced by the
/// signer, so any quote or backslash inside is rejected.
fn unquote(value: &str) -> Option<&str> {
    let inner = value.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('"') || inner.contains('\\') {
        return None;
    }
    Some(inner)
}

fn invalid(reason: impl Into<String>) -> AuthError {
    AuthError::InvalidSignature(reason.into())
}
