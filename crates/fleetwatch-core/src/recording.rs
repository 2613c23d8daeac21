//! Recording of polled snapshots, plus one-off snapshot export.
//!
//! # Storage Format
//!
//! Each recording is a directory containing:
//! - `units.jsonl`: one line per unit per committed poll, in the backend's
//!   log record format (`timestamp`, `boat_id`, `lat`, `lon`, ...). The file
//!   can be uploaded back to the backend to replay the session.
//! - `session.json`: metadata written by [`SnapshotRecorder::finish`].

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::poller::FleetView;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Contents of `session.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingMeta {
    pub version: u32,
    pub id: String,
    pub backend: String,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u64,
    pub polls: u64,
    pub records: u64,
    pub note: Option<String>,
    pub fleetwatch_version: String,
}

/// Configuration for a recording.
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    pub output_dir: PathBuf,
    pub backend: String,
    pub note: Option<String>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            backend: String::new(),
            note: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SnapshotRecorder
// ---------------------------------------------------------------------------

/// Appends committed snapshots to a recording directory.
pub struct SnapshotRecorder {
    session_dir: PathBuf,
    units_writer: BufWriter<File>,
    polls: u64,
    records: u64,
    last_poll: Option<u64>,
    started_at: SystemTime,
    started_instant: Instant,
    session_id: String,
    config: RecordingConfig,
}

impl SnapshotRecorder {
    /// Create the recording directory and open `units.jsonl`.
    pub fn new(config: RecordingConfig) -> Result<Self> {
        let session_id = Uuid::new_v4().to_string();
        let started_at = SystemTime::now();

        let ts = started_at.duration_since(UNIX_EPOCH).unwrap_or_default();
        let dir_name = format!("{}-{}", format_iso8601_compact(ts), &session_id[..8]);
        let session_dir = config.output_dir.join(dir_name);
        fs::create_dir_all(&session_dir).map_err(|e| Error::io(&session_dir, e))?;

        let units_path = session_dir.join("units.jsonl");
        let units_file = File::create(&units_path).map_err(|e| Error::io(&units_path, e))?;

        log::info!("recording to {}", session_dir.display());
        Ok(Self {
            session_dir,
            units_writer: BufWriter::new(units_file),
            polls: 0,
            records: 0,
            last_poll: None,
            started_at,
            started_instant: Instant::now(),
            session_id,
            config,
        })
    }

    /// Append every unit of `view`. Returns `false` without writing when this
    /// commit was already recorded or nothing has been polled yet.
    pub fn record(&mut self, view: &FleetView) -> Result<bool> {
        if !view.has_data() || self.last_poll == Some(view.polls) {
            return Ok(false);
        }
        self.last_poll = Some(view.polls);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let fallback_ts = format_iso8601_millis(now);

        let path = self.session_dir.join("units.jsonl");
        for unit in &view.snapshot.units {
            let mut unit = unit.clone();
            if unit.timestamp.is_none() {
                unit.timestamp = Some(fallback_ts.clone());
            }
            let line = serde_json::to_string(&unit)?;
            writeln!(self.units_writer, "{line}").map_err(|e| Error::io(&path, e))?;
            self.records += 1;
        }
        self.units_writer.flush().map_err(|e| Error::io(&path, e))?;
        self.polls += 1;
        Ok(true)
    }

    /// Flush and write `session.json`. Returns the recording directory.
    pub fn finish(mut self) -> Result<PathBuf> {
        let units_path = self.session_dir.join("units.jsonl");
        self.units_writer
            .flush()
            .map_err(|e| Error::io(&units_path, e))?;

        let ended_at = SystemTime::now();
        let meta = RecordingMeta {
            version: 1,
            id: self.session_id,
            backend: self.config.backend.clone(),
            started_at: format_iso8601(self.started_at.duration_since(UNIX_EPOCH).unwrap_or_default()),
            ended_at: format_iso8601(ended_at.duration_since(UNIX_EPOCH).unwrap_or_default()),
            duration_ms: self.started_instant.elapsed().as_millis() as u64,
            polls: self.polls,
            records: self.records,
            note: self.config.note.clone(),
            fleetwatch_version: crate::VERSION.to_string(),
        };

        let meta_path = self.session_dir.join("session.json");
        let json = serde_json::to_string_pretty(&meta)?;
        fs::write(&meta_path, json).map_err(|e| Error::io(&meta_path, e))?;

        log::info!(
            "recording finished: {} polls, {} records",
            self.polls,
            self.records
        );
        Ok(self.session_dir)
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn elapsed(&self) -> Duration {
        self.started_instant.elapsed()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write the current view (snapshot, stats, bounds) as pretty JSON into
/// `dir`. Returns the file path.
pub fn export_snapshot(dir: &Path, view: &FleetView) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let path = dir.join(format!("fleet-snapshot-{}.json", format_iso8601_compact(ts)));

    let json = serde_json::json!({
        "exported_at": format_iso8601(ts),
        "polls": view.polls,
        "is_active": view.snapshot.is_active,
        "speed": view.snapshot.speed,
        "stats": view.stats,
        "bounds": view.bounds,
        "units": view.snapshot.units,
    });
    let body = serde_json::to_string_pretty(&json)?;
    fs::write(&path, body).map_err(|e| Error::io(&path, e))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Timestamp helpers
// ---------------------------------------------------------------------------

/// `2026-02-15T013000Z`, for directory and file names.
fn format_iso8601_compact(since_epoch: Duration) -> String {
    let (year, month, day, hour, min, sec) = secs_to_utc(since_epoch.as_secs());
    format!("{year:04}-{month:02}-{day:02}T{hour:02}{min:02}{sec:02}Z")
}

/// `2026-02-15T01:30:00Z`
fn format_iso8601(since_epoch: Duration) -> String {
    let (year, month, day, hour, min, sec) = secs_to_utc(since_epoch.as_secs());
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
}

/// `2026-02-15T01:30:00.250Z`
fn format_iso8601_millis(since_epoch: Duration) -> String {
    let (year, month, day, hour, min, sec) = secs_to_utc(since_epoch.as_secs());
    let millis = since_epoch.subsec_millis();
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}.{millis:03}Z")
}

/// Seconds since the Unix epoch to UTC (year, month, day, hour, minute,
/// second). No leap seconds.
fn secs_to_utc(secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let sec = secs % 60;
    let min = (secs / 60) % 60;
    let hour = (secs / 3600) % 24;

    let mut days = secs / 86400;
    let mut year = 1970u64;
    loop {
        let days_in_year = if is_leap(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let months_days: [u64; 12] = if is_leap(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 0u64;
    for (i, &md) in months_days.iter().enumerate() {
        if days < md {
            month = i as u64 + 1;
            break;
        }
        days -= md;
    }

    (year, month, days + 1, hour, min, sec)
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::FleetState;
    use crate::snapshot::SnapshotResponse;
    use crate::unit::Unit;

    fn committed_view(units: Vec<Unit>) -> FleetView {
        let mut state = FleetState::new();
        state.apply(Ok(SnapshotResponse {
            units,
            is_active: true,
            speed: None,
        }));
        state.view().clone()
    }

    #[test]
    fn iso8601_epoch() {
        assert_eq!(format_iso8601(Duration::from_secs(0)), "1970-01-01T00:00:00Z");
        assert_eq!(format_iso8601_compact(Duration::from_secs(0)), "1970-01-01T000000Z");
    }

    #[test]
    fn iso8601_millis() {
        assert_eq!(
            format_iso8601_millis(Duration::from_millis(1_250)),
            "1970-01-01T00:00:01.250Z"
        );
    }

    #[test]
    fn iso8601_leap_day() {
        // 2024-02-29T12:00:00Z
        assert_eq!(
            format_iso8601(Duration::from_secs(1_709_208_000)),
            "2024-02-29T12:00:00Z"
        );
    }

    #[test]
    fn recorder_writes_units_and_meta() {
        let tmp = tempfile::tempdir().unwrap();
        let mut recorder = SnapshotRecorder::new(RecordingConfig {
            output_dir: tmp.path().to_path_buf(),
            backend: "http://127.0.0.1:8000".to_string(),
            note: Some("harbor test".to_string()),
        })
        .unwrap();
        let dir = recorder.session_dir().to_path_buf();
        assert!(dir.join("units.jsonl").exists());

        let mut stamped = Unit::new("2", 24.1, 119.6, "MOVING");
        stamped.timestamp = Some("2026-01-01T00:00:01Z".to_string());
        let view = committed_view(vec![Unit::new("1", 24.0, 119.5, "IDLE"), stamped]);

        assert!(recorder.record(&view).unwrap());
        // Same commit twice is not duplicated.
        assert!(!recorder.record(&view).unwrap());
        assert_eq!(recorder.records(), 2);

        let path = recorder.finish().unwrap();
        assert_eq!(path, dir);

        let lines: Vec<serde_json::Value> = fs::read_to_string(dir.join("units.jsonl"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["boat_id"], "1");
        assert!(lines[0]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(lines[1]["timestamp"], "2026-01-01T00:00:01Z");

        let meta: RecordingMeta =
            serde_json::from_str(&fs::read_to_string(dir.join("session.json")).unwrap()).unwrap();
        assert_eq!(meta.polls, 1);
        assert_eq!(meta.records, 2);
        assert_eq!(meta.note.as_deref(), Some("harbor test"));
    }

    #[test]
    fn recorder_skips_before_first_poll() {
        let tmp = tempfile::tempdir().unwrap();
        let mut recorder = SnapshotRecorder::new(RecordingConfig {
            output_dir: tmp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        assert!(!recorder.record(&FleetView::default()).unwrap());
        assert_eq!(recorder.polls(), 0);
    }

    #[test]
    fn export_writes_pretty_json() {
        let tmp = tempfile::tempdir().unwrap();
        let view = committed_view(vec![Unit::new("U1", 10.0, 20.0, "ERROR")]);
        let path = export_snapshot(tmp.path(), &view).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["stats"]["error"], 1);
        assert_eq!(value["units"][0]["boat_id"], "U1");
        assert_eq!(value["is_active"], true);
    }
}
