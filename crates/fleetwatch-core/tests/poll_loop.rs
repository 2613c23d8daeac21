//! Timing behavior of the poll loop, on tokio's paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fleetwatch_core::{Error, Result, SnapshotResponse, SnapshotSource, Unit, poller};

/// Source that takes `latency` to answer and tracks overlapping calls.
struct SlowSource {
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowSource {
    fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }
}

impl SnapshotSource for SlowSource {
    async fn fetch_snapshot(&self) -> Result<SnapshotResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        // Every third call fails, the rest report a unit whose id is the call number.
        if n % 3 == 2 {
            return Err(Error::Status {
                endpoint: "/map-data".to_string(),
                status: 504,
            });
        }
        Ok(SnapshotResponse {
            units: vec![Unit::new(n.to_string(), 24.0, 119.5, "MOVING")],
            is_active: true,
            speed: None,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn polls_on_fixed_cadence() {
    let source = SlowSource::new(Duration::from_millis(10));
    let (handle, _channels) = poller::spawn(Arc::clone(&source), Duration::from_millis(500));

    // First poll fires immediately, then one every 500 ms.
    tokio::time::sleep(Duration::from_millis(2_250)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 5);
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn slow_responses_never_overlap() {
    // Round trip longer than the period.
    let source = SlowSource::new(Duration::from_millis(1_200));
    let (handle, channels) = poller::spawn(Arc::clone(&source), Duration::from_millis(500));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    let calls = source.calls.load(Ordering::SeqCst);
    assert!((7..=9).contains(&calls), "calls = {calls}");

    // The committed unit always comes from the latest successful call.
    let view = channels.view.borrow().clone();
    let committed: usize = view.snapshot.units[0].id.parse().unwrap();
    assert!(committed % 3 != 2);
    assert_eq!(view.polls + view.failures, calls as u64 - source.in_flight.load(Ordering::SeqCst) as u64);
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_cancels_loop() {
    let source = SlowSource::new(Duration::from_millis(10));
    {
        let (_handle, _channels) = poller::spawn(Arc::clone(&source), Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(1_100)).await;
    }
    let calls = source.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), calls);
}
