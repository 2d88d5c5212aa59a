//! Timeline normalization
//!
//! Turns the raw check events reported by the backend into a sorted,
//! de-duplicated, labeled sequence. Field names changed across API versions,
//! so every field is looked up under each of its known spellings.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::domain::check_event::{CheckEvent, CheckEventType, RawCheckEvent};
use crate::domain::geo::GeoPoint;

const TYPE_KEYS: &[&str] = &["event_type", "type", "kind", "event"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "occurred_at", "created_at", "checked_at", "time"];
const LAT_KEYS: &[&str] = &["lat", "latitude"];
const LNG_KEYS: &[&str] = &["lng", "lon", "longitude"];
const ACTOR_KEYS: &[&str] = &["actor_id", "user_id", "actor"];

/// One labeled line of a job timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub event: CheckEvent,
    pub label: &'static str,
}

/// Normalizes raw check events into a chronological timeline
///
/// Records without a parseable timestamp are dropped. Two records with the
/// same event type at the same instant are treated as the same event.
pub fn normalize_timeline(raw: &[RawCheckEvent]) -> Vec<TimelineEntry> {
    let mut events: Vec<CheckEvent> = raw.iter().filter_map(parse_event).collect();

    events.sort_by(|a, b| (a.timestamp, &a.event_type).cmp(&(b.timestamp, &b.event_type)));
    events.dedup_by(|later, earlier| {
        later.timestamp == earlier.timestamp && later.event_type == earlier.event_type
    });

    events
        .into_iter()
        .map(|event| TimelineEntry {
            label: event.event_type.label(),
            event,
        })
        .collect()
}

/// Whether any normalized entry is of the given type
pub fn has_event(timeline: &[TimelineEntry], event_type: &CheckEventType) -> bool {
    timeline.iter().any(|entry| &entry.event.event_type == event_type)
}

fn parse_event(raw: &RawCheckEvent) -> Option<CheckEvent> {
    let timestamp = raw.str_field(TIMESTAMP_KEYS).and_then(parse_timestamp)?;

    let event_type = raw
        .str_field(TYPE_KEYS)
        .map(CheckEventType::parse)
        .unwrap_or_else(|| CheckEventType::Other(String::new()));

    let coordinate = match (raw.f64_field(LAT_KEYS), raw.f64_field(LNG_KEYS)) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).ok(),
        _ => None,
    };

    Some(CheckEvent {
        event_type,
        timestamp,
        coordinate,
        actor_id: raw.str_field(ACTOR_KEYS).map(str::to_string),
    })
}

/// Parses RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS[.fff]` taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
