//! Push delivery configuration.

use std::time::Duration;

/// How often a keepalive is written while the callback runs.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// How long to wait for the peer to hang up after the ack or nack.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for push deliveries.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Interval between keepalive events.
    pub keepalive_interval: Duration,
    /// Wait for the peer to close the request after the terminal event.
    pub confirmation_timeout: Duration,
    /// Frames buffered between the delivery driver and the response body.
    pub event_buffer: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            event_buffer: 16,
        }
    }
}
