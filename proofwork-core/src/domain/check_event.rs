//! Check-in / check-out event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::geo::GeoPoint;

/// A check event exactly as the backend reported it
///
/// Older API versions used different field names for the event type and the
/// timestamp, so the record is kept untyped until the timeline normalizer
/// reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawCheckEvent(pub serde_json::Value);

impl RawCheckEvent {
    /// Returns the first string field found among `keys`
    pub fn str_field(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.0.get(*key).and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Returns the first numeric field found among `keys`
    ///
    /// Numbers sent as strings are accepted as well.
    pub fn f64_field(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }
}

impl From<serde_json::Value> for RawCheckEvent {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A normalized check event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckEvent {
    pub event_type: CheckEventType,
    pub timestamp: DateTime<Utc>,
    pub coordinate: Option<GeoPoint>,
    pub actor_id: Option<String>,
}

/// Kind of a check event
///
/// `Other` keeps event types this client does not know about so they can
/// still be shown with a generic label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckEventType {
    CheckIn,
    CheckOut,
    Other(String),
}

impl CheckEventType {
    /// Parses a raw type name, accepting the spellings older backends used
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "check_in" | "checkin" | "checked_in" => CheckEventType::CheckIn,
            "check_out" | "checkout" | "checked_out" => CheckEventType::CheckOut,
            _ => CheckEventType::Other(normalized),
        }
    }

    /// Human-readable label for timelines
    pub fn label(&self) -> &'static str {
        match self {
            CheckEventType::CheckIn => "Checked in",
            CheckEventType::CheckOut => "Checked out",
            CheckEventType::Other(_) => "Activity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_event_type_variants() {
        assert_eq!(CheckEventType::parse("check_in"), CheckEventType::CheckIn);
        assert_eq!(CheckEventType::parse("Check-In"), CheckEventType::CheckIn);
        assert_eq!(CheckEventType::parse("checkout"), CheckEventType::CheckOut);
        assert_eq!(
            CheckEventType::parse("note"),
            CheckEventType::Other("note".to_string())
        );
    }

    #[test]
    fn test_raw_field_lookup() {
        let raw = RawCheckEvent(json!({ "type": "check_in", "lat": "52.1", "lng": 4.3 }));
        assert_eq!(raw.str_field(&["event_type", "type"]), Some("check_in"));
        assert_eq!(raw.f64_field(&["lat"]), Some(52.1));
        assert_eq!(raw.f64_field(&["lng"]), Some(4.3));
        assert_eq!(raw.str_field(&["missing"]), None);
    }
}
