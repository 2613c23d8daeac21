//! Error taxonomy for talking to the fleet backend.
//!
//! None of these are fatal to the polling loop: poll failures leave the
//! committed snapshot untouched and the next tick tries again. Operator
//! commands hand the error back to whoever issued them.

use std::path::PathBuf;

/// Errors produced by the core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure, timeout, or an unreadable response body.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The body was not JSON at all. Missing fields are defaulted instead.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Playback speed outside the recognized set.
    #[error("unsupported playback speed {0} (expected one of 1, 2, 5, 10)")]
    UnsupportedSpeed(f64),

    /// Upload file or recording I/O.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid backend URL or endpoint path.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error came from reaching the backend rather than from
    /// local input.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mentions_endpoint_and_code() {
        let err = Error::Status {
            endpoint: "/map-data".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "/map-data returned HTTP 503");
        assert!(err.is_transport());
    }

    #[test]
    fn speed_error_is_local() {
        let err = Error::UnsupportedSpeed(3.0);
        assert!(!err.is_transport());
        assert!(err.to_string().contains("1, 2, 5, 10"));
    }

    #[test]
    fn malformed_wraps_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = Error::from(serde_err);
        assert!(matches!(err, Error::Malformed(_)));
        assert!(!err.is_transport());
    }
}
