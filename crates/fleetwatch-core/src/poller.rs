//! Fixed-cadence snapshot polling.
//!
//! A single tokio task owns the [`FleetState`] and is its only writer. Each
//! tick it fetches one snapshot, waits for the answer, commits it, and
//! publishes the result on a `watch` channel. Because the fetch is awaited
//! inline there is never more than one request in flight, so commits happen
//! in issuance order. Ticks that fall due while a slow request is pending
//! are delayed rather than bursted.
//!
//! ```text
//!   Idle ──tick──▶ Polling ──response/failure──▶ Idle
//! ```
//!
//! The loop has no terminal state; it ends only when the [`PollerHandle`] is
//! stopped or dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::SnapshotSource;
use crate::error::Result;
use crate::geo::BoundingBox;
use crate::notify::{self, NotificationReceiver, NotificationSender, SimulationEnded, TransitionNotifier};
use crate::snapshot::{FleetSnapshot, FleetStats, SnapshotResponse};

// ---------------------------------------------------------------------------
// FleetView: what readers see
// ---------------------------------------------------------------------------

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PollerPhase {
    #[default]
    Idle,
    Polling,
}

/// Committed state published after every poll.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetView {
    pub snapshot: FleetSnapshot,
    pub stats: FleetStats,
    pub bounds: BoundingBox,
    pub phase: PollerPhase,
    /// Successful polls so far; bumps on every commit.
    pub polls: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
}

impl FleetView {
    /// True once at least one poll has succeeded.
    pub fn has_data(&self) -> bool {
        self.polls > 0
    }
}

// ---------------------------------------------------------------------------
// FleetState: single-writer reducer
// ---------------------------------------------------------------------------

/// Result of applying one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Snapshot replaced. Carries the notification if this poll ended the
    /// simulation.
    Updated(Option<SimulationEnded>),
    /// Poll failed; previous snapshot kept.
    Failed,
}

/// Everything the poller mutates.
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    view: FleetView,
    notifier: TransitionNotifier,
}

impl FleetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &FleetView {
        &self.view
    }

    pub fn snapshot(&self) -> &FleetSnapshot {
        &self.view.snapshot
    }

    /// Fold one poll result into the state.
    ///
    /// On success the snapshot is replaced wholesale, stats and bounds are
    /// recomputed and the transition notifier observes the new active flag.
    /// On failure nothing but the failure counters changes.
    pub fn apply(&mut self, result: Result<SnapshotResponse>) -> PollOutcome {
        self.view.phase = PollerPhase::Idle;
        match result {
            Ok(response) => {
                if self.view.consecutive_failures > 0 {
                    log::info!(
                        "backend reachable again after {} failed polls",
                        self.view.consecutive_failures
                    );
                }
                self.view.snapshot.replace(response);
                self.view.stats = self.view.snapshot.stats();
                self.view.bounds = BoundingBox::from_units(&self.view.snapshot.units);
                self.view.polls += 1;
                self.view.consecutive_failures = 0;
                self.view.last_error = None;

                let ended = self.notifier.observe(self.view.snapshot.is_active);
                if ended.is_some() {
                    log::info!("simulation ended (poll #{})", self.view.polls);
                }
                log::debug!(
                    "poll #{}: {} units ({} error), active={}, speed={}",
                    self.view.polls,
                    self.view.stats.total,
                    self.view.stats.error,
                    self.view.snapshot.is_active,
                    self.view.snapshot.speed
                );
                PollOutcome::Updated(ended)
            }
            Err(e) => {
                self.view.failures += 1;
                self.view.consecutive_failures += 1;
                // One warning per outage; the rest go to debug.
                if self.view.consecutive_failures == 1 {
                    log::warn!("snapshot poll failed: {e}");
                } else {
                    log::debug!(
                        "snapshot poll failed ({} in a row): {e}",
                        self.view.consecutive_failures
                    );
                }
                self.view.last_error = Some(e.to_string());
                PollOutcome::Failed
            }
        }
    }

    /// Fetch from `source` once and apply the result.
    pub async fn poll<S: SnapshotSource>(&mut self, source: &S) -> PollOutcome {
        self.view.phase = PollerPhase::Polling;
        let result = source.fetch_snapshot().await;
        self.apply(result)
    }
}

// ---------------------------------------------------------------------------
// Spawned loop
// ---------------------------------------------------------------------------

/// Reader side of a running poller.
pub struct PollerChannels {
    /// Latest committed view. Cloning the `Arc` is all a reader needs.
    pub view: watch::Receiver<Arc<FleetView>>,
    /// One `SimulationEnded` per running → stopped transition.
    pub notifications: NotificationReceiver,
}

/// Owner of a running poll loop. Dropping it cancels the loop.
pub struct PollerHandle {
    task: Option<JoinHandle<()>>,
    refresh: Arc<Notify>,
}

impl PollerHandle {
    /// Ask for an extra poll right away instead of waiting for the next tick.
    /// Requests made while a poll is in flight run as soon as it completes.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Cancel the loop. An in-flight request is abandoned with it.
    pub fn stop(mut self) {
        self.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("poller stopped");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start polling `source` every `interval`. Must be called from within a
/// tokio runtime.
///
/// The first poll is issued immediately.
pub fn spawn<S: SnapshotSource>(source: S, interval: Duration) -> (PollerHandle, PollerChannels) {
    let (view_tx, view_rx) = watch::channel(Arc::new(FleetView::default()));
    let (note_tx, note_rx) = notify::channel();
    let refresh = Arc::new(Notify::new());

    let task = tokio::spawn(run_loop(source, interval, view_tx, note_tx, Arc::clone(&refresh)));

    (
        PollerHandle {
            task: Some(task),
            refresh,
        },
        PollerChannels {
            view: view_rx,
            notifications: note_rx,
        },
    )
}

async fn run_loop<S: SnapshotSource>(
    source: S,
    interval: Duration,
    view_tx: watch::Sender<Arc<FleetView>>,
    note_tx: NotificationSender,
    refresh: Arc<Notify>,
) {
    let mut state = FleetState::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => ticker.reset(),
        }

        state.view.phase = PollerPhase::Polling;
        view_tx.send_replace(Arc::new(state.view.clone()));

        let result = source.fetch_snapshot().await;
        if let PollOutcome::Updated(Some(event)) = state.apply(result) {
            // Nobody listening is fine; the event is simply dropped.
            let _ = note_tx.send(event);
        }
        view_tx.send_replace(Arc::new(state.view.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::unit::Unit;

    fn response(units: Vec<Unit>, is_active: bool, speed: Option<f64>) -> Result<SnapshotResponse> {
        Ok(SnapshotResponse {
            units,
            is_active,
            speed,
        })
    }

    fn transport_failure() -> Result<SnapshotResponse> {
        Err(Error::Status {
            endpoint: "/map-data".to_string(),
            status: 502,
        })
    }

    #[test]
    fn success_replaces_and_derives() {
        let mut state = FleetState::new();
        let mut broken = Unit::new("U1", 1.0, 1.0, "ERROR");
        broken.error_details = Some("gps loss".to_string());
        let outcome = state.apply(response(
            vec![broken, Unit::new("U2", 2.0, 2.0, "MOVING")],
            true,
            Some(2.0),
        ));

        assert_eq!(outcome, PollOutcome::Updated(None));
        let view = state.view();
        assert_eq!(view.stats.total, 2);
        assert_eq!(view.stats.error, 1);
        assert_eq!(view.stats.online, 1);
        assert_eq!(view.snapshot.speed, 2.0);
        assert_eq!(view.bounds, BoundingBox::from_units(&view.snapshot.units));
        assert_eq!(view.polls, 1);
        assert_eq!(view.phase, PollerPhase::Idle);
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut state = FleetState::new();
        state.apply(response(vec![Unit::new("U1", 1.0, 1.0, "NORMAL")], true, Some(5.0)));
        let before = state.snapshot().clone();
        let bounds_before = state.view().bounds;

        assert_eq!(state.apply(transport_failure()), PollOutcome::Failed);

        assert_eq!(state.snapshot(), &before);
        assert_eq!(state.view().bounds, bounds_before);
        assert_eq!(state.view().polls, 1);
        assert_eq!(state.view().failures, 1);
        assert!(state.view().last_error.as_deref().unwrap().contains("502"));
    }

    #[test]
    fn failure_does_not_fake_a_transition() {
        let mut state = FleetState::new();
        state.apply(response(vec![], true, None));
        assert_eq!(state.apply(transport_failure()), PollOutcome::Failed);
        // Still active from the notifier's point of view.
        assert_eq!(
            state.apply(response(vec![], false, None)),
            PollOutcome::Updated(Some(SimulationEnded))
        );
    }

    #[test]
    fn recovery_resets_failure_streak() {
        let mut state = FleetState::new();
        state.apply(transport_failure());
        state.apply(transport_failure());
        assert_eq!(state.view().consecutive_failures, 2);
        state.apply(response(vec![], false, None));
        assert_eq!(state.view().consecutive_failures, 0);
        assert_eq!(state.view().failures, 2);
        assert!(state.view().last_error.is_none());
    }

    #[test]
    fn transitions_fire_on_falling_edges_only() {
        let mut state = FleetState::new();
        let fired: Vec<usize> = [true, true, false, false, true, false]
            .into_iter()
            .enumerate()
            .filter(|&(_, active)| {
                state.apply(response(vec![], active, None)) == PollOutcome::Updated(Some(SimulationEnded))
            })
            .map(|(i, _)| i)
            .collect();
        assert_eq!(fired, [2, 5]);
    }

    #[test]
    fn fresh_view_has_no_data() {
        let state = FleetState::new();
        assert!(!state.view().has_data());
        assert_eq!(state.view().snapshot.speed, crate::snapshot::DEFAULT_SPEED);
    }
}
