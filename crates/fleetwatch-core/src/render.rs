//! Render-surface contract: what a drawing backend gets and how markers
//! move between polls.
//!
//! Each snapshot is laid out in its own view space. Between polls a marker
//! glides from where it was last drawn to its new target, so a unit never
//! jumps even when the bounding box is re-derived under it. During the
//! glide a start position taken from the previous box may sit outside
//! `[0, 100]`; [`to_cell`] clips rather than failing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::classify::{Treatment, classify};
use crate::geo::{BoundingBox, ViewPoint};
use crate::snapshot::FleetSnapshot;

/// One unit, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: String,
    pub position: ViewPoint,
    pub treatment: Treatment,
    pub course_deg: f64,
    pub battery: f64,
    /// Only set for `Treatment::Error`.
    pub error_details: Option<String>,
}

/// Project and classify every unit of `snapshot` against `bounds`.
pub fn layout(snapshot: &FleetSnapshot, bounds: &BoundingBox) -> Vec<Marker> {
    snapshot
        .units
        .iter()
        .map(|unit| {
            let treatment = classify(&unit.status, snapshot.is_active);
            Marker {
                id: unit.id.clone(),
                position: bounds.project(unit.lat, unit.lon),
                treatment,
                course_deg: unit.course_deg,
                battery: unit.battery,
                error_details: match treatment {
                    Treatment::Error => unit.error_details.clone(),
                    _ => None,
                },
            }
        })
        .collect()
}

/// Map a percentage onto a grid of `extent` cells. Returns `None` for
/// anything off the canvas.
pub fn to_cell(percent: f64, extent: u16) -> Option<u16> {
    if extent == 0 || !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return None;
    }
    let max = f64::from(extent - 1);
    Some((percent / 100.0 * max).round() as u16)
}

/// Whether a pulsing marker is in its bright phase on this frame.
pub fn pulse_on(frame: u64) -> bool {
    (frame / 4) % 2 == 0
}

// ---------------------------------------------------------------------------
// MarkerAnimator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Track {
    from: ViewPoint,
    to: ViewPoint,
    started: Instant,
}

impl Track {
    fn at(&self, now: Instant, transition: Duration) -> ViewPoint {
        if transition.is_zero() {
            return self.to;
        }
        let t = now.saturating_duration_since(self.started).as_secs_f64() / transition.as_secs_f64();
        self.from.lerp(self.to, t)
    }
}

/// Keeps the last drawn position of every unit and eases toward new targets.
#[derive(Debug, Clone)]
pub struct MarkerAnimator {
    transition: Duration,
    tracks: HashMap<String, Track>,
    generation: Option<u64>,
}

impl MarkerAnimator {
    pub fn new(transition: Duration) -> Self {
        Self {
            transition,
            tracks: HashMap::new(),
            generation: None,
        }
    }

    /// Retarget tracks for a new committed snapshot. `generation` identifies
    /// the commit; calling again with the same generation is a no-op.
    ///
    /// New units start at their target, units missing from `markers` are
    /// forgotten, and the rest glide from their current drawn position.
    pub fn sync(&mut self, generation: u64, markers: &[Marker], now: Instant) {
        if self.generation == Some(generation) {
            return;
        }
        self.generation = Some(generation);

        let mut next = HashMap::with_capacity(markers.len());
        for marker in markers {
            let from = match self.tracks.get(&marker.id) {
                Some(track) => track.at(now, self.transition),
                None => marker.position,
            };
            next.insert(
                marker.id.clone(),
                Track {
                    from,
                    to: marker.position,
                    started: now,
                },
            );
        }
        self.tracks = next;
    }

    /// Drawn position of `id` at `now`.
    pub fn position(&self, id: &str, now: Instant) -> Option<ViewPoint> {
        self.tracks.get(id).map(|t| t.at(now, self.transition))
    }

    /// `markers` with positions replaced by their animated positions.
    pub fn frame(&self, markers: &[Marker], now: Instant) -> Vec<Marker> {
        markers
            .iter()
            .map(|m| Marker {
                position: self.position(&m.id, now).unwrap_or(m.position),
                ..m.clone()
            })
            .collect()
    }

    /// True while any marker is still moving.
    pub fn is_animating(&self, now: Instant) -> bool {
        self.tracks
            .values()
            .any(|t| t.from != t.to && now.saturating_duration_since(t.started) < self.transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Unit;

    fn snapshot(units: Vec<Unit>, is_active: bool) -> FleetSnapshot {
        FleetSnapshot {
            units,
            is_active,
            speed: 1.0,
        }
    }

    fn marker(id: &str, x: f64, y: f64) -> Marker {
        Marker {
            id: id.to_string(),
            position: ViewPoint::new(x, y),
            treatment: Treatment::Normal,
            course_deg: 0.0,
            battery: 100.0,
            error_details: None,
        }
    }

    #[test]
    fn layout_classifies_and_projects() {
        let mut broken = Unit::new("E", 10.0, 20.0, "ERROR");
        broken.error_details = Some("Motor Failure".to_string());
        let mut moving = Unit::new("M", 11.0, 21.0, "MOVING");
        moving.error_details = Some("stale".to_string());
        let snap = snapshot(vec![broken, moving], true);
        let bounds = BoundingBox::from_units(&snap.units);

        let markers = layout(&snap, &bounds);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].treatment, Treatment::Error);
        assert_eq!(markers[0].error_details.as_deref(), Some("Motor Failure"));
        assert_eq!(markers[1].treatment, Treatment::Moving);
        assert_eq!(markers[1].error_details, None);
        assert!(markers.iter().all(|m| m.position.in_view()));
    }

    #[test]
    fn layout_respects_inactive_fleet() {
        let snap = snapshot(vec![Unit::new("M", 0.0, 0.0, "MOVING")], false);
        let markers = layout(&snap, &BoundingBox::from_units(&snap.units));
        assert_eq!(markers[0].treatment, Treatment::Normal);
    }

    #[test]
    fn to_cell_maps_edges() {
        assert_eq!(to_cell(0.0, 80), Some(0));
        assert_eq!(to_cell(100.0, 80), Some(79));
        assert_eq!(to_cell(50.0, 81), Some(40));
    }

    #[test]
    fn to_cell_clips_outside_values() {
        assert_eq!(to_cell(-0.1, 80), None);
        assert_eq!(to_cell(100.1, 80), None);
        assert_eq!(to_cell(f64::NAN, 80), None);
        assert_eq!(to_cell(f64::INFINITY, 80), None);
        assert_eq!(to_cell(50.0, 0), None);
    }

    #[test]
    fn new_markers_appear_at_target() {
        let now = Instant::now();
        let mut anim = MarkerAnimator::new(Duration::from_millis(400));
        anim.sync(1, &[marker("a", 10.0, 10.0)], now);
        assert_eq!(anim.position("a", now), Some(ViewPoint::new(10.0, 10.0)));
        assert!(!anim.is_animating(now));
    }

    #[test]
    fn markers_glide_between_targets() {
        let t0 = Instant::now();
        let mut anim = MarkerAnimator::new(Duration::from_millis(400));
        anim.sync(1, &[marker("a", 0.0, 0.0)], t0);
        anim.sync(2, &[marker("a", 40.0, 80.0)], t0);

        assert_eq!(anim.position("a", t0), Some(ViewPoint::new(0.0, 0.0)));
        let mid = anim.position("a", t0 + Duration::from_millis(200)).unwrap();
        assert!((mid.x - 20.0).abs() < 1e-9 && (mid.y - 40.0).abs() < 1e-9);
        assert_eq!(
            anim.position("a", t0 + Duration::from_millis(400)),
            Some(ViewPoint::new(40.0, 80.0))
        );
        assert!(anim.is_animating(t0 + Duration::from_millis(100)));
        assert!(!anim.is_animating(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn retarget_mid_glide_starts_from_drawn_position() {
        let t0 = Instant::now();
        let mut anim = MarkerAnimator::new(Duration::from_millis(400));
        anim.sync(1, &[marker("a", 0.0, 0.0)], t0);
        anim.sync(2, &[marker("a", 100.0, 0.0)], t0);
        let t1 = t0 + Duration::from_millis(100);
        anim.sync(3, &[marker("a", 0.0, 0.0)], t1);
        let p = anim.position("a", t1).unwrap();
        assert!((p.x - 25.0).abs() < 1e-9, "x = {}", p.x);
    }

    #[test]
    fn same_generation_is_ignored() {
        let t0 = Instant::now();
        let mut anim = MarkerAnimator::new(Duration::from_millis(400));
        anim.sync(7, &[marker("a", 0.0, 0.0)], t0);
        anim.sync(7, &[marker("a", 90.0, 90.0)], t0);
        assert_eq!(anim.position("a", t0 + Duration::from_secs(1)), Some(ViewPoint::new(0.0, 0.0)));
    }

    #[test]
    fn vanished_units_are_dropped() {
        let t0 = Instant::now();
        let mut anim = MarkerAnimator::new(Duration::from_millis(400));
        anim.sync(1, &[marker("a", 0.0, 0.0), marker("b", 5.0, 5.0)], t0);
        anim.sync(2, &[marker("b", 5.0, 5.0)], t0);
        assert_eq!(anim.position("a", t0), None);
        let frame = anim.frame(&[marker("b", 5.0, 5.0)], t0);
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn zero_transition_snaps() {
        let t0 = Instant::now();
        let mut anim = MarkerAnimator::new(Duration::ZERO);
        anim.sync(1, &[marker("a", 0.0, 0.0)], t0);
        anim.sync(2, &[marker("a", 60.0, 60.0)], t0);
        assert_eq!(anim.position("a", t0), Some(ViewPoint::new(60.0, 60.0)));
    }

    #[test]
    fn pulse_alternates() {
        assert!(pulse_on(0));
        assert!(!pulse_on(4));
        assert!(pulse_on(8));
    }
}
