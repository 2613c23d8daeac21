//! HTTP client for the fleet backend.
//!
//! The backend is an opaque service: one snapshot endpoint that is polled,
//! plus operator commands (start/stop, playback speed, log upload).

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::WatchConfig;
use crate::error::{Error, Result};
use crate::snapshot::SnapshotResponse;

// ---------------------------------------------------------------------------
// SnapshotSource
// ---------------------------------------------------------------------------

/// Something the poller can pull fleet snapshots from.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch_snapshot(&self) -> impl Future<Output = Result<SnapshotResponse>> + Send;
}

impl<T: SnapshotSource> SnapshotSource for Arc<T> {
    fn fetch_snapshot(&self) -> impl Future<Output = Result<SnapshotResponse>> + Send {
        T::fetch_snapshot(self)
    }
}

// ---------------------------------------------------------------------------
// PlaybackSpeed
// ---------------------------------------------------------------------------

/// Playback multipliers the backend recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackSpeed {
    #[default]
    X1,
    X2,
    X5,
    X10,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [Self::X1, Self::X2, Self::X5, Self::X10];

    pub fn multiplier(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X5 => 5,
            Self::X10 => 10,
        }
    }

    /// Accepts exactly 1, 2, 5 or 10.
    pub fn from_multiplier(value: f64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|s| f64::from(s.multiplier()) == value)
            .ok_or(Error::UnsupportedSpeed(value))
    }

    /// Closest recognized speed to what the backend reports.
    pub fn nearest(value: f64) -> Self {
        Self::ALL
            .into_iter()
            .min_by(|a, b| {
                let da = (f64::from(a.multiplier()) - value).abs();
                let db = (f64::from(b.multiplier()) - value).abs();
                da.total_cmp(&db)
            })
            .unwrap_or_default()
    }

    pub fn next(self) -> Self {
        match self {
            Self::X1 => Self::X2,
            Self::X2 => Self::X5,
            Self::X5 => Self::X10,
            Self::X10 => Self::X1,
        }
    }
}

impl std::fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.multiplier())
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Operator command sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    SetSpeed(PlaybackSpeed),
    Upload(PathBuf),
}

impl Command {
    pub fn label(&self) -> String {
        match self {
            Self::Start => "start simulation".to_string(),
            Self::Stop => "stop simulation".to_string(),
            Self::SetSpeed(speed) => format!("set speed {speed}"),
            Self::Upload(path) => format!("upload {}", path.display()),
        }
    }

    /// Whether success should trigger an immediate re-poll.
    pub fn wants_refresh(&self) -> bool {
        matches!(self, Self::Upload(_) | Self::Start | Self::Stop)
    }
}

/// What the backend said about an accepted upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadReceipt {
    pub message: Option<String>,
    pub count: Option<u64>,
}

#[derive(Serialize)]
struct SpeedRequest {
    speed: u32,
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// reqwest-based client for one backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: WatchConfig,
}

impl HttpBackend {
    pub fn new(config: WatchConfig) -> Result<Self> {
        // Validate the base URL up front rather than on the first tick.
        config.url(&config.endpoints.snapshot)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub async fn start_simulation(&self) -> Result<()> {
        self.post_empty(&self.config.endpoints.start).await
    }

    pub async fn stop_simulation(&self) -> Result<()> {
        self.post_empty(&self.config.endpoints.stop).await
    }

    pub async fn set_speed(&self, speed: PlaybackSpeed) -> Result<()> {
        let endpoint = &self.config.endpoints.speed;
        let resp = self
            .client
            .post(self.config.url(endpoint)?)
            .json(&SpeedRequest {
                speed: speed.multiplier(),
            })
            .send()
            .await?;
        check_status(endpoint, &resp)?;
        Ok(())
    }

    /// Send a log file to the backend's ingestion endpoint.
    pub async fn upload(&self, path: &Path) -> Result<UploadReceipt> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.jsonl".to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(data).file_name(file_name));

        let endpoint = &self.config.endpoints.upload;
        let resp = self
            .client
            .post(self.config.url(endpoint)?)
            .multipart(form)
            .send()
            .await?;
        check_status(endpoint, &resp)?;

        // The receipt is informational; an odd body does not undo the upload.
        let body = resp.text().await.unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        Ok(UploadReceipt {
            message: value
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            count: value.get("count").and_then(|c| c.as_u64()),
        })
    }

    /// Run a command, returning a short success message.
    pub async fn execute(&self, command: &Command) -> Result<String> {
        log::info!("sending command: {}", command.label());
        match command {
            Command::Start => self.start_simulation().await.map(|_| "simulation started".into()),
            Command::Stop => self.stop_simulation().await.map(|_| "simulation stopped".into()),
            Command::SetSpeed(speed) => self
                .set_speed(*speed)
                .await
                .map(|_| format!("playback speed {speed}")),
            Command::Upload(path) => {
                let receipt = self.upload(path).await?;
                Ok(receipt
                    .message
                    .unwrap_or_else(|| format!("uploaded {}", path.display())))
            }
        }
    }

    async fn post_empty(&self, endpoint: &str) -> Result<()> {
        let resp = self.client.post(self.config.url(endpoint)?).send().await?;
        check_status(endpoint, &resp)?;
        Ok(())
    }
}

impl SnapshotSource for HttpBackend {
    async fn fetch_snapshot(&self) -> Result<SnapshotResponse> {
        let endpoint = &self.config.endpoints.snapshot;
        let resp = self.client.get(self.config.url(endpoint)?).send().await?;
        check_status(endpoint, &resp)?;
        let body = resp.text().await?;
        SnapshotResponse::from_json(&body)
    }
}

fn check_status(endpoint: &str, resp: &reqwest::Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}
