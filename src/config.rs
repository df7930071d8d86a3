//! Board configuration.

use crate::error::{BoardError, Result};
use crate::types::SubscriptionKey;
use std::time::Duration;

/// Environment variable holding the backend base URL.
pub const BACKEND_URL_ENV: &str = "BOARD_BACKEND_URL";

/// Environment variable holding the collaborator request timeout, in seconds.
pub const REQUEST_TIMEOUT_ENV: &str = "BOARD_REQUEST_TIMEOUT_SECS";

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Status value that marks a board entry as departed.
pub const DEPARTED_STATUS: &str = "Departed";

/// Retention rule for departed board entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Status that starts the retention window.
    /// Default: "Departed"
    pub departed_status: String,

    /// How long past its departure time a departed entry stays on the board.
    /// Default: 5 minutes
    pub window: Duration,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            departed_status: DEPARTED_STATUS.to_string(),
            window: Duration::from_secs(5 * 60),
        }
    }
}

impl EvictionPolicy {
    /// Whether a departed entry `elapsed` past its departure time is due for
    /// eviction. Only whole elapsed minutes count; the window itself is
    /// compared exactly, so a 90s window expires at two minutes.
    pub fn is_expired(&self, elapsed: chrono::Duration) -> bool {
        let whole_minutes = elapsed.num_minutes();
        if whole_minutes < 0 {
            return false;
        }
        u128::from(whole_minutes.unsigned_abs()) * 60_000 >= self.window.as_millis()
    }
}

/// Configuration for the board client.
#[derive(Clone, Debug)]
pub struct BoardConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,

    /// Timeout for the catalog and clock fetches.
    /// Default: 10s
    pub request_timeout: Duration,

    /// Eviction rule for departed entries.
    pub eviction: EvictionPolicy,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            eviction: EvictionPolicy::default(),
        }
    }
}

impl BoardConfig {
    /// Build a config from `BOARD_BACKEND_URL` and `BOARD_REQUEST_TIMEOUT_SECS`,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config = config.with_base_url(url);
        }

        if let Ok(raw) = std::env::var(REQUEST_TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                BoardError::Config(format!("{} must be a whole number, got {:?}", REQUEST_TIMEOUT_ENV, raw))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the backend base URL. A trailing slash is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the eviction rule.
    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Check the config is usable.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(BoardError::Config("base_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Push channel address for a subscription key.
    pub fn stream_url(&self, key: &SubscriptionKey) -> String {
        format!("{}/stream/{}", self.base_url, key)
    }

    /// Address of the stop catalog.
    pub fn stops_url(&self) -> String {
        format!("{}/get_stops", self.base_url)
    }

    /// Address of the backend clock.
    pub fn time_url(&self) -> String {
        format!("{}/get_time", self.base_url)
    }
}
