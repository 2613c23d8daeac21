//! Fleet snapshot: the replace-wholesale state returned by one poll.

use serde::Serialize;

use crate::unit::{Unit, UnitStatus};

/// Playback speed assumed before the backend reports one.
pub const DEFAULT_SPEED: f64 = 1.0;

// ---------------------------------------------------------------------------
// Wire response
// ---------------------------------------------------------------------------

/// Decoded body of the snapshot endpoint.
///
/// Decoding is lenient: `boats` defaults to empty, `is_active` to false and a
/// missing or non-numeric `speed` is `None`. Individual malformed boats are
/// dropped without failing the rest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotResponse {
    pub units: Vec<Unit>,
    pub is_active: bool,
    pub speed: Option<f64>,
}

impl SnapshotResponse {
    pub fn from_json(body: &str) -> crate::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &serde_json::Value) -> Self {
        let units = match value.get("boats").and_then(|b| b.as_array()) {
            Some(boats) => boats.iter().filter_map(Unit::from_value).collect(),
            None => Vec::new(),
        };
        let is_active = value
            .get("is_active")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let speed = value
            .get("speed")
            .and_then(|v| v.as_f64())
            .filter(|s| s.is_finite());

        Self {
            units,
            is_active,
            speed,
        }
    }
}

// ---------------------------------------------------------------------------
// FleetSnapshot
// ---------------------------------------------------------------------------

/// Last committed fleet state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub units: Vec<Unit>,
    pub is_active: bool,
    pub speed: f64,
}

impl Default for FleetSnapshot {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            is_active: false,
            speed: DEFAULT_SPEED,
        }
    }
}

impl FleetSnapshot {
    /// Replace this snapshot with a poll response. Speed is kept when the
    /// response omits it.
    pub fn replace(&mut self, response: SnapshotResponse) {
        self.units = response.units;
        self.is_active = response.is_active;
        if let Some(speed) = response.speed {
            self.speed = speed;
        }
    }

    pub fn stats(&self) -> FleetStats {
        FleetStats::from_units(&self.units)
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }
}

// ---------------------------------------------------------------------------
// FleetStats
// ---------------------------------------------------------------------------

/// Counts derived from the current unit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FleetStats {
    pub total: usize,
    pub online: usize,
    pub error: usize,
}

impl FleetStats {
    pub fn from_units(units: &[Unit]) -> Self {
        let total = units.len();
        let error = units
            .iter()
            .filter(|u| u.status() == UnitStatus::Error)
            .count();
        Self {
            total,
            online: total - error,
            error,
        }
    }
}
