//! A single fleet member as reported by the backend.
//!
//! Units are read-only to this crate: the backend owns set membership and
//! every successful poll replaces the whole set.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// UnitStatus
// ---------------------------------------------------------------------------

/// Health/activity status reported for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitStatus {
    /// Anything that is neither `MOVING` nor `ERROR`, including `IDLE` and
    /// values this client has never seen.
    #[default]
    Normal,
    Moving,
    Error,
}

impl UnitStatus {
    /// Parse a raw status string. Never fails; unknown values are `Normal`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("ERROR") {
            Self::Error
        } else if raw.eq_ignore_ascii_case("MOVING") {
            Self::Moving
        } else {
            Self::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Moving => "MOVING",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// One tracked vehicle.
///
/// Field names on the wire follow the backend's log record format, so a
/// serialized `Unit` can be fed back to the backend's upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier. The backend sends integers or strings.
    #[serde(rename = "boat_id", deserialize_with = "de_unit_id")]
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    /// Heading in degrees, 0–360.
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub course_deg: f64,
    /// Raw status string as sent by the backend.
    #[serde(default, deserialize_with = "de_status")]
    pub status: String,
    /// Battery percentage, 0–100.
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub battery: f64,
    #[serde(
        default,
        deserialize_with = "de_error_details",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_details: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub speed_knots: Option<f64>,
    #[serde(
        default,
        deserialize_with = "de_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
}

impl Unit {
    /// Convenience constructor used by tests and demos.
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, status: &str) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            course_deg: 0.0,
            status: status.to_string(),
            battery: 100.0,
            error_details: None,
            speed_knots: None,
            timestamp: None,
        }
    }

    /// Parsed status.
    pub fn status(&self) -> UnitStatus {
        UnitStatus::parse(&self.status)
    }

    /// Error description, only when the unit is actually in `ERROR`.
    pub fn error_details(&self) -> Option<&str> {
        match self.status() {
            UnitStatus::Error => self.error_details.as_deref(),
            _ => None,
        }
    }

    /// Parse one entry of the backend's `boats` array. Only entries without a
    /// usable id or coordinates yield `None`; any other field that is null or
    /// wrong-typed falls back to its default.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match Unit::deserialize(value) {
            Ok(unit) if unit.lat.is_finite() && unit.lon.is_finite() => Some(unit),
            Ok(unit) => {
                log::debug!("dropping unit {} with non-finite position", unit.id);
                None
            }
            Err(e) => {
                log::debug!("dropping malformed unit entry: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

fn de_unit_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(d)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

fn de_status<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    // Non-string statuses degrade to NORMAL rather than dropping the unit.
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn de_error_details<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn de_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(serde_json::Value::deserialize(d)?
        .as_f64()
        .filter(|v| v.is_finite()))
}

fn de_lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(de_opt_f64(d)?.unwrap_or_default())
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    // Some logs carry epoch seconds instead of ISO text.
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
