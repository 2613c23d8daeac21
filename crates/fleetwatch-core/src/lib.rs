//! # fleetwatch-core
//!
//! State synchronization and map projection for a fleet of autonomous
//! surface vehicles.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fleetwatch_core::{HttpBackend, WatchConfig, poller};
//!
//! # async fn demo() -> fleetwatch_core::Result<()> {
//! let config = WatchConfig::for_backend("http://127.0.0.1:8000");
//! let backend = HttpBackend::new(config.clone())?;
//! let (handle, mut channels) = poller::spawn(backend, config.poll_interval);
//!
//! // Latest committed fleet view.
//! let view = channels.view.borrow().clone();
//! println!("{} units, {} in error", view.stats.total, view.stats.error);
//!
//! // One event per running -> stopped transition.
//! if channels.notifications.recv().await.is_some() {
//!     println!("simulation ended");
//! }
//! handle.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Backend → Poller (single writer) → FleetView → Bounds → Projection →
//! Markers → render surface
//!
//! The poller also feeds the active flag into a [`TransitionNotifier`],
//! whose events arrive on a typed channel.

pub mod backend;
pub mod classify;
pub mod config;
pub mod error;
pub mod geo;
pub mod notify;
pub mod poller;
pub mod recording;
pub mod render;
pub mod snapshot;
pub mod unit;

pub use backend::{Command, HttpBackend, PlaybackSpeed, SnapshotSource, UploadReceipt};
pub use classify::{Treatment, classify};
pub use config::{Endpoints, WatchConfig};
pub use error::{Error, Result};
pub use geo::{BoundingBox, ViewPoint, project};
pub use notify::{SimulationEnded, TransitionNotifier};
pub use poller::{FleetState, FleetView, PollOutcome, PollerChannels, PollerHandle, PollerPhase};
pub use recording::{RecordingConfig, RecordingMeta, SnapshotRecorder, export_snapshot};
pub use render::{Marker, MarkerAnimator, layout, to_cell};
pub use snapshot::{FleetSnapshot, FleetStats, SnapshotResponse};
pub use unit::{Unit, UnitStatus};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
