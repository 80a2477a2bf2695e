// ── Runtime session configuration ──
//
// Describes *where* to connect and how patiently to reconnect.
// Never touches disk: the CLI resolves profiles and tokens, builds a
// `SessionConfig`, and hands it to `Session::new`.

use std::time::Duration;

use emsmon_api::Endpoint;

/// Pause between a lost connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Update period requested in every rtv subscription (seconds).
pub const DEFAULT_RTV_PERIOD_SECS: u32 = 5;

/// Upper bound on a single handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Broadcast buffer for [`SessionEvent`](crate::SessionEvent)s.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for one telemetry session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server, token, and upgrade-request headers.
    pub endpoint: Endpoint,
    pub reconnect_delay: Duration,
    pub rtv_period_secs: u32,
    pub connect_timeout: Duration,
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Config for `endpoint` with default timing.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            rtv_period_secs: DEFAULT_RTV_PERIOD_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_rtv_period(mut self, secs: u32) -> Self {
        self.rtv_period_secs = secs;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
