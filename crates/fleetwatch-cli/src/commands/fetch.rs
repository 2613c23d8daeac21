use std::fmt::Write;

use fleetwatch_core::config::DEFAULT_POLL_INTERVAL;
use fleetwatch_core::{FleetState, FleetView, PollOutcome, layout};

pub fn run(backend: Option<&str>, json: bool) {
    let config = super::make_config(backend, DEFAULT_POLL_INTERVAL.as_millis() as u64);
    let base = config.backend.clone();
    let client = super::make_backend(config);

    let rt = super::runtime();
    let mut state = FleetState::new();
    if rt.block_on(state.poll(&client)) == PollOutcome::Failed {
        let reason = state.view().last_error.clone().unwrap_or_default();
        eprintln!("Could not fetch fleet snapshot from {base}: {reason}");
        std::process::exit(1);
    }

    if json {
        match serde_json::to_string_pretty(state.view()) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to encode snapshot: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", render_table(state.view()));
    }
}

/// Human-readable fleet table with projected view coordinates.
pub fn render_table(view: &FleetView) -> String {
    let snap = &view.snapshot;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Simulation {}   speed x{}   {} units ({} online, {} error)",
        if snap.is_active { "RUNNING" } else { "STOPPED" },
        snap.speed,
        view.stats.total,
        view.stats.online,
        view.stats.error
    );
    let b = &view.bounds;
    let _ = writeln!(
        out,
        "Bounds lat {:.4}..{:.4}  lon {:.4}..{:.4}",
        b.min_lat, b.max_lat, b.min_lon, b.max_lon
    );
    let _ = writeln!(out);

    if snap.units.is_empty() {
        let _ = writeln!(out, "  (no units reported)");
        return out;
    }

    let _ = writeln!(
        out,
        "  {:<8} {:<8} {:>10} {:>11} {:>7} {:>7} {:>6} {:>6}  DETAILS",
        "ID", "STATE", "LAT", "LON", "COURSE", "BATT", "X%", "Y%"
    );
    for (unit, marker) in snap.units.iter().zip(layout(snap, &view.bounds)) {
        let _ = writeln!(
            out,
            "  {:<8} {:<8} {:>10.5} {:>11.5} {:>6.0}° {:>6.1}% {:>6.1} {:>6.1}  {}",
            unit.id,
            marker.treatment.label(),
            unit.lat,
            unit.lon,
            unit.course_deg,
            unit.battery,
            marker.position.x,
            marker.position.y,
            marker.error_details.as_deref().unwrap_or("")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_core::{SnapshotResponse, Unit};

    fn view(units: Vec<Unit>, is_active: bool) -> FleetView {
        let mut state = FleetState::new();
        state.apply(Ok(SnapshotResponse {
            units,
            is_active,
            speed: Some(2.0),
        }));
        state.view().clone()
    }

    #[test]
    fn test_table_lists_units_with_treatment() {
        let mut broken = Unit::new("U1", 1.0, 1.0, "ERROR");
        broken.error_details = Some("gps loss".to_string());
        let table = render_table(&view(
            vec![broken, Unit::new("U2", 1.5, 1.2, "MOVING")],
            true,
        ));
        assert!(table.contains("RUNNING"));
        assert!(table.contains("2 units (1 online, 1 error)"));
        assert!(table.contains("gps loss"));
        assert!(table.lines().any(|l| l.contains("U2") && l.contains("MOVING")));
    }

    #[test]
    fn test_table_inactive_moving_is_normal() {
        let table = render_table(&view(vec![Unit::new("U2", 1.5, 1.2, "MOVING")], false));
        assert!(table.contains("STOPPED"));
        assert!(table.lines().any(|l| l.contains("U2") && l.contains("NORMAL")));
    }

    #[test]
    fn test_table_empty_fleet() {
        let table = render_table(&view(vec![], false));
        assert!(table.contains("no units reported"));
    }
}
