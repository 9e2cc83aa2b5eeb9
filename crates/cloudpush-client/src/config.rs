//! Client configuration.

use std::fmt;
use std::sync::Arc;

use cloudpush_auth::{Clock, KeyRegistry, SystemClock};
use reqwest::Url;

use crate::error::{ClientError, Result};

/// Control plane used when no host is configured.
pub const DEFAULT_HOST: &str = "https://api.cloudpush.dev";

/// Characters that would break the credential string if they appeared in an
/// app slug or environment name.
const FORBIDDEN_IDENTITY_CHARS: [char; 3] = ['/', '"', ','];

/// Configuration for talking to the control plane.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the control plane.
    pub host: String,
    /// The application this SDK is running as.
    pub app_slug: String,
    /// The environment this SDK is running in.
    pub env_name: String,
    /// All live auth keys. The newest signs outgoing requests; any of them
    /// verifies incoming ones.
    pub keys: KeyRegistry,
    /// Time source for signing and verification.
    pub clock: Arc<dyn Clock>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            app_slug: String::new(),
            env_name: String::new(),
            keys: KeyRegistry::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl ClientConfig {
    /// Check the configuration can sign requests and reach a host.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        validate_identity("app slug", &self.app_slug)?;
        validate_identity("env name", &self.env_name)?;
        if self.keys.is_empty() {
            return Err(ClientError::Config("at least one auth key is required".into()));
        }
        Ok(())
    }

    /// Build an endpoint URL under the host from raw path segments.
    ///
    /// Each segment is percent-escaped on its own, so a topic id containing
    /// `/` or `?` stays a single segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url()?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("host {:?} cannot be a base", self.host)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.host)
            .map_err(|err| ClientError::Config(format!("invalid host {:?}: {err}", self.host)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "host {:?} must use http or https",
                self.host
            )));
        }
        if url.host_str().is_none() || url.query().is_some() || url.fragment().is_some() {
            return Err(ClientError::Config(format!(
                "host {:?} must be a plain base URL",
                self.host
            )));
        }
        Ok(url)
    }
}

fn validate_identity(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ClientError::Config(format!("{what} must not be empty")));
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || FORBIDDEN_IDENTITY_CHARS.contains(&c))
    {
        return Err(ClientError::Config(format!(
            "{what} {value:?} contains a reserved character"
        )));
    }
    Ok(())
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("app_slug", &self.app_slug)
            .field("env_name", &self.env_name)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
