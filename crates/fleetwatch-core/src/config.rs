//! Runtime configuration for the poller and backend client.

use std::time::Duration;

/// Backend used when neither a flag nor `FLEETWATCH_BACKEND` is set.
pub const DEFAULT_BACKEND: &str = "http://127.0.0.1:8000";

/// Environment variable overriding the default backend URL.
pub const BACKEND_ENV: &str = "FLEETWATCH_BACKEND";

/// Fixed poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Paths of the backend endpoints, relative to the backend URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub snapshot: String,
    pub start: String,
    pub stop: String,
    pub speed: String,
    pub upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            snapshot: "/map-data".to_string(),
            start: "/simulation/start".to_string(),
            stop: "/simulation/stop".to_string(),
            speed: "/simulation/speed".to_string(),
            upload: "/upload".to_string(),
        }
    }
}

/// Configuration for watching a fleet.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub backend: String,
    pub endpoints: Endpoints,
    pub poll_interval: Duration,
    /// Per-request timeout; a timeout counts as a transport failure.
    pub request_timeout: Duration,
    /// How long a marker takes to glide to its new position.
    pub transition: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            backend: std::env::var(BACKEND_ENV).unwrap_or_else(|_| DEFAULT_BACKEND.to_string()),
            endpoints: Endpoints::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(2),
            transition: Duration::from_millis(400),
        }
    }
}

impl WatchConfig {
    /// Default configuration pointed at `backend`.
    pub fn for_backend(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Default::default()
        }
    }

    /// Join the backend URL and an endpoint path.
    pub fn url(&self, path: &str) -> crate::Result<reqwest::Url> {
        let base = self.backend.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        reqwest::Url::parse(&format!("{base}/{path}"))
            .map_err(|e| crate::Error::Config(format!("{}: {e}", self.backend)))
    }
}
