//! Lenient decoding of schedule rows as they arrive from the schedules API.
//!
//! Upstream rows are loosely typed: booleans show up as `0/1` or strings, dates
//! come in several layouts or not at all. Decoding never fails on a single bad
//! field; the field falls back to its neutral value instead.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::model::ids::{CourseId, ScheduleId, TopicId};
use crate::model::schedule::ScheduleRow;

const NAIVE_LAYOUTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Response shape of the course schedules endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulesResponse {
    #[serde(default, deserialize_with = "lenient_rows")]
    pub upcoming_schedules: Vec<ScheduleRow>,
    #[serde(default, deserialize_with = "lenient_rows")]
    pub completed_schedules: Vec<ScheduleRow>,
}

impl SchedulesResponse {
    #[must_use]
    pub fn new(upcoming_schedules: Vec<ScheduleRow>, completed_schedules: Vec<ScheduleRow>) -> Self {
        Self {
            upcoming_schedules,
            completed_schedules,
        }
    }

    /// Parse a response body.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` only when the body is not a JSON object;
    /// malformed rows inside it are decoded leniently.
    pub fn from_json_str(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upcoming_schedules.is_empty() && self.completed_schedules.is_empty()
    }
}

/// Decode a single row from an arbitrary JSON value.
///
/// Returns `None` when the value is not an object at all.
#[must_use]
pub fn row_from_value(value: &Value) -> Option<ScheduleRow> {
    let map = value.as_object()?;
    Some(ScheduleRow {
        topic_id: TopicId::new(lenient_u64(map, "topic_id")),
        schedule_id: ScheduleId::new(match map.get("schedule_id") {
            Some(_) => lenient_u64(map, "schedule_id"),
            None => lenient_u64(map, "id"),
        }),
        course_id: CourseId::new(lenient_u64(map, "course_id")),
        title: map.get("title").and_then(Value::as_str).map(str::to_owned),
        start_date_time: map.get("start_date_time").and_then(lenient_datetime),
        end_date_time: map.get("end_date_time").and_then(lenient_datetime),
        is_marked_completed: lenient_bool(map, "is_marked_completed"),
        is_time_completed: lenient_bool(map, "is_time_completed"),
        is_upcoming: lenient_bool(map, "is_upcoming"),
        is_live_now: lenient_bool(map, "is_live_now"),
    })
}

fn lenient_rows<'de, D>(deserializer: D) -> Result<Vec<ScheduleRow>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let rows = match value {
        Value::Array(items) => items.iter().filter_map(row_from_value).collect(),
        _ => Vec::new(),
    };
    Ok(rows)
}

fn lenient_u64(map: &Map<String, Value>, key: &str) -> u64 {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn lenient_bool(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

/// Parses RFC 3339, a few naive UTC layouts, or epoch milliseconds.
fn lenient_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

/// Parse a timestamp string the way the schedules API emits them.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_well_formed_response() {
        let body = json!({
            "upcoming_schedules": [{
                "topic_id": 3,
                "schedule_id": 30,
                "start_date_time": "2023-11-20T10:00:00Z",
                "end_date_time": "2023-11-20T11:00:00Z",
                "is_marked_completed": false
            }],
            "completed_schedules": [{
                "topic_id": 1,
                "schedule_id": 10,
                "start_date_time": "2023-11-01 10:00:00",
                "end_date_time": "2023-11-01 11:00:00",
                "is_marked_completed": true
            }]
        })
        .to_string();

        let resp = SchedulesResponse::from_json_str(&body).unwrap();

        assert_eq!(resp.upcoming_schedules.len(), 1);
        assert_eq!(resp.completed_schedules.len(), 1);
        let done = &resp.completed_schedules[0];
        assert_eq!(done.schedule_id, ScheduleId::new(10));
        assert!(done.is_marked_completed);
        assert_eq!(
            done.end_date_time,
            Some(parse_timestamp("2023-11-01T11:00:00Z").unwrap())
        );
    }

    #[test]
    fn malformed_fields_fall_back_to_neutral_values() {
        let value = json!({
            "topic_id": "12",
            "id": 5,
            "end_date_time": "yesterday-ish",
            "start_date_time": null,
            "is_marked_completed": "yes please"
        });

        let row = row_from_value(&value).unwrap();

        assert_eq!(row.topic_id, TopicId::new(12));
        assert_eq!(row.schedule_id, ScheduleId::new(5));
        assert_eq!(row.start_date_time, None);
        assert_eq!(row.end_date_time, None);
        assert!(!row.is_marked_completed);
    }

    #[test]
    fn numeric_and_string_booleans_are_accepted() {
        let a = row_from_value(&json!({ "is_marked_completed": 1 })).unwrap();
        let b = row_from_value(&json!({ "is_marked_completed": "true" })).unwrap();
        let c = row_from_value(&json!({ "is_marked_completed": 0 })).unwrap();
        assert!(a.is_marked_completed);
        assert!(b.is_marked_completed);
        assert!(!c.is_marked_completed);
    }

    #[test]
    fn non_object_rows_are_skipped_and_missing_arrays_default() {
        let body = r#"{ "completed_schedules": [null, 4, {"schedule_id": 1}] }"#;
        let resp = SchedulesResponse::from_json_str(body).unwrap();
        assert!(resp.upcoming_schedules.is_empty());
        assert_eq!(resp.completed_schedules.len(), 1);
    }

    #[test]
    fn non_array_partition_is_treated_as_empty() {
        let body = r#"{ "upcoming_schedules": "oops", "completed_schedules": {} }"#;
        let resp = SchedulesResponse::from_json_str(body).unwrap();
        assert!(resp.is_empty());
    }

    #[test]
    fn epoch_millis_timestamps_are_accepted() {
        let row = row_from_value(&json!({ "end_date_time": 1_700_000_000_000_i64 })).unwrap();
        assert_eq!(row.end_timestamp_millis(), 1_700_000_000_000);
    }
}
