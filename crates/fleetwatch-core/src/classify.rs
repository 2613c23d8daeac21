//! Map a unit's status to how it should be drawn.

use serde::Serialize;

use crate::unit::UnitStatus;

/// Rendering treatment for a unit marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Treatment {
    #[default]
    Normal,
    /// Pulsing marker. Only while the fleet simulation is active.
    Moving,
    /// Alert marker with persistent emphasis and the error details shown.
    Error,
}

impl Treatment {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Moving => "MOVING",
            Self::Error => "ERROR",
        }
    }
}

/// Classify a raw status string given the fleet-wide active flag.
///
/// Total over every input: unknown statuses are `Normal`, and `MOVING` is
/// only `Moving` while `is_active` is set.
pub fn classify(status: &str, is_active: bool) -> Treatment {
    match UnitStatus::parse(status) {
        UnitStatus::Error => Treatment::Error,
        UnitStatus::Moving if is_active => Treatment::Moving,
        UnitStatus::Moving | UnitStatus::Normal => Treatment::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_wins_regardless_of_activity() {
        assert_eq!(classify("ERROR", true), Treatment::Error);
        assert_eq!(classify("ERROR", false), Treatment::Error);
    }

    #[test]
    fn moving_needs_active_fleet() {
        assert_eq!(classify("MOVING", true), Treatment::Moving);
        assert_eq!(classify("MOVING", false), Treatment::Normal);
    }

    #[test]
    fn everything_else_is_normal() {
        for raw in ["NORMAL", "IDLE", "UNKNOWN", "", "moving-ish", "\u{0}"] {
            assert_eq!(classify(raw, true), Treatment::Normal, "{raw:?}");
            assert_eq!(classify(raw, false), Treatment::Normal, "{raw:?}");
        }
    }

    #[test]
    fn treatment_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&Treatment::Moving).unwrap(),
            "\"MOVING\""
        );
    }
}
