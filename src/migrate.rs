/*
Schema migration for task records.
Turns one raw JSON record of any historical shape into the current Task.
Kept free of I/O so the store and the tests share one code path.
*/

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::MigrationError;
use crate::models::{parse_date, parse_timestamp, Task, TIMESTAMP_FORMAT};

// Fields added after the first release and the value older records get.
// The document carries no version marker, so every record is checked
// against the whole table.
const BACKFILLS: &[(&str, fn() -> Value)] = &[
    // v2: recurrence
    ("repeat_type", || Value::Null),
    ("last_repeated_date", || Value::Null),
    // v3: time tracking
    ("time_spent", || Value::from(0)),
    ("is_running", || Value::Bool(false)),
    // v4: per-day log, completion stamp, tags
    ("time_log", || Value::Object(Map::new())),
    ("completion_date", || Value::Null),
    ("tags", || Value::Array(Vec::new())),
];

// Localized literals written by earlier releases.
const LEGACY_DONE: &str = "Выполнено";
const LEGACY_PRIORITIES: [(&str, &str); 3] =
    [("Высокий", "high"), ("Средний", "medium"), ("Низкий", "low")];

/// Bring one raw record up to the current task shape.
///
/// Missing fields are back-filled, legacy literals normalized, and the
/// running flag is always cleared: a timer that was live when the process
/// died must not resume on its own.
pub fn migrate_record(raw: Value, now: NaiveDateTime) -> Result<Task, MigrationError> {
    let Value::Object(mut rec) = raw else {
        return Err(MigrationError::NotAnObject);
    };
    for required in ["id", "title"] {
        if !rec.contains_key(required) {
            return Err(MigrationError::MissingField(required));
        }
    }

    // v1 fields that very old or hand-edited records may lack
    fill_missing(&mut rec, "description", Value::String(String::new()));
    fill_missing(&mut rec, "due_date", Value::Null);

    for (field, default) in BACKFILLS {
        fill_missing(&mut rec, field, default());
    }

    normalize_id(&mut rec)?;
    normalize_time_spent(&mut rec);
    normalize_status(&mut rec);
    normalize_priority(&mut rec);
    normalize_date(&mut rec, "due_date");
    normalize_date(&mut rec, "last_repeated_date");
    normalize_repeat_type(&mut rec);
    normalize_created(&mut rec, now);
    normalize_completion_date(&mut rec);
    normalize_time_log(&mut rec);
    normalize_tags(&mut rec);

    rec.insert("is_running".to_string(), Value::Bool(false));

    Ok(serde_json::from_value(Value::Object(rec))?)
}

// Hand-edited and float-writing tools store whole numbers as `12.0`.
fn whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

fn normalize_id(rec: &mut Map<String, Value>) -> Result<(), MigrationError> {
    let id = rec
        .get("id")
        .and_then(whole_number)
        .ok_or(MigrationError::InvalidId)?;
    rec.insert("id".to_string(), Value::from(id));
    Ok(())
}

fn normalize_time_spent(rec: &mut Map<String, Value>) {
    let secs = match rec.get("time_spent") {
        Some(v) => whole_number(v).unwrap_or_else(|| {
            warn!(id = ?rec.get("id"), value = %v, "unreadable time_spent, resetting to 0");
            0
        }),
        None => 0,
    };
    rec.insert("time_spent".to_string(), Value::from(secs));
}

// Null counts as missing: older writers emitted null for "nothing yet".
fn fill_missing(rec: &mut Map<String, Value>, field: &str, default: Value) {
    if matches!(rec.get(field), None | Some(Value::Null)) {
        rec.insert(field.to_string(), default);
    }
}

fn normalize_status(rec: &mut Map<String, Value>) {
    let done = match rec.get("status") {
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("done") || s == LEGACY_DONE
        }
        _ => false,
    };
    let status = if done { "done" } else { "not_done" };
    rec.insert("status".to_string(), Value::from(status));
}

fn normalize_priority(rec: &mut Map<String, Value>) {
    let priority = match rec.get("priority").and_then(Value::as_str).map(str::trim) {
        Some("high") => "high",
        Some("medium") | None => "medium",
        Some("low") => "low",
        Some(p) => match LEGACY_PRIORITIES.iter().find(|(legacy, _)| *legacy == p) {
            Some((_, current)) => *current,
            None => {
                warn!(priority = p, "unknown priority, reading as medium");
                "medium"
            }
        },
    };
    rec.insert("priority".to_string(), Value::from(priority));
}

// "" and unparseable dates both mean "no date".
fn normalize_date(rec: &mut Map<String, Value>, field: &str) {
    let parsed = match rec.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            let d = parse_date(s);
            if d.is_none() {
                warn!(field, value = %s, "unparseable date, dropping");
            }
            d
        }
        _ => None,
    };
    let value = parsed.map_or(Value::Null, |d| Value::from(d.to_string()));
    rec.insert(field.to_string(), value);
}

fn normalize_repeat_type(rec: &mut Map<String, Value>) {
    let value = match rec.get("repeat_type").and_then(Value::as_str).map(str::trim) {
        Some(r @ ("daily" | "weekly" | "monthly")) => Value::from(r),
        _ => Value::Null,
    };
    rec.insert("repeat_type".to_string(), value);
}

fn normalize_created(rec: &mut Map<String, Value>, now: NaiveDateTime) {
    let parsed = rec
        .get("created")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let created = parsed.unwrap_or_else(|| {
        warn!(id = ?rec.get("id"), "missing or unparseable creation time, using load time");
        now
    });
    rec.insert(
        "created".to_string(),
        Value::from(created.format(TIMESTAMP_FORMAT).to_string()),
    );
}

fn normalize_completion_date(rec: &mut Map<String, Value>) {
    let parsed = rec
        .get("completion_date")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let value = parsed.map_or(Value::Null, |ts| {
        Value::from(ts.format(TIMESTAMP_FORMAT).to_string())
    });
    rec.insert("completion_date".to_string(), value);
}

// Keeps only well-formed `date -> seconds` entries.
fn normalize_time_log(rec: &mut Map<String, Value>) {
    let cleaned: Map<String, Value> = match rec.get("time_log") {
        Some(Value::Object(log)) => log
            .iter()
            .filter_map(|(day, secs)| {
                let day = parse_date(day)?;
                let secs = whole_number(secs)?;
                Some((day.to_string(), Value::from(secs)))
            })
            .collect(),
        _ => Map::new(),
    };
    rec.insert("time_log".to_string(), Value::Object(cleaned));
}

fn normalize_tags(rec: &mut Map<String, Value>) {
    let tags: Vec<Value> = match rec.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Value::from)
            .collect(),
        _ => Vec::new(),
    };
    rec.insert("tags".to_string(), Value::Array(tags));
}
