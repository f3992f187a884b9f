use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

// On-disk format of `created` / `completion_date` ("dd.MM.yyyy HH:mm")
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

// On-disk format of calendar dates ("yyyy-MM-dd")
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Declaration order is display order: high sorts first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotDone,
    Done,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepeatType {
    Daily,
    Weekly,
    Monthly,
}

impl RepeatType {
    /// Fixed step between occurrences. `Monthly` is a flat 30 days, not a
    /// calendar month, so persisted `last_repeated_date` values keep firing
    /// on the same dates.
    pub fn step_days(self) -> u64 {
        match self {
            RepeatType::Daily => 1,
            RepeatType::Weekly => 7,
            RepeatType::Monthly => 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>, // None = inbox task
    #[serde(with = "timestamp")]
    pub created: NaiveDateTime,
    pub repeat_type: Option<RepeatType>,
    pub last_repeated_date: Option<NaiveDate>, // due date of the latest spawned successor
    pub time_spent: u64,                       // seconds, resettable
    pub time_log: BTreeMap<NaiveDate, u64>,    // seconds per day, never reset
    pub is_running: bool,
    #[serde(with = "timestamp::option")]
    pub completion_date: Option<NaiveDateTime>,
    pub tags: Vec<String>,
}

impl Task {
    // Fresh task as created by the user: not done, no time tracked.
    pub fn new(id: u64, title: String, created: NaiveDateTime) -> Self {
        Task {
            id,
            title,
            description: String::new(),
            priority: Priority::Medium,
            status: TaskStatus::NotDone,
            due_date: None,
            created,
            repeat_type: None,
            last_repeated_date: None,
            time_spent: 0,
            time_log: BTreeMap::new(),
            is_running: false,
            completion_date: None,
            tags: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Move to `status`, stamping `completion_date` on the transition to
    /// done and clearing it on the way back.
    pub fn set_status(&mut self, status: TaskStatus, now: NaiveDateTime) {
        match (self.status, status) {
            (TaskStatus::NotDone, TaskStatus::Done) => self.completion_date = Some(now),
            (_, TaskStatus::NotDone) => self.completion_date = None,
            (TaskStatus::Done, TaskStatus::Done) => {}
        }
        self.status = status;
    }

    pub fn toggle_status(&mut self, now: NaiveDateTime) {
        let next = match self.status {
            TaskStatus::NotDone => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::NotDone,
        };
        self.set_status(next, now);
    }
}

// One past the current maximum; None once the id space is exhausted.
pub fn next_task_id(tasks: &[Task]) -> Option<u64> {
    tasks.iter().map(|t| t.id).max().unwrap_or(0).checked_add(1)
}

// Local wall-clock time at the minute precision the documents store.
pub fn local_now() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn parse_priority(s: &str) -> Option<Priority> {
    match s.trim() {
        "high" => Some(Priority::High),
        "medium" => Some(Priority::Medium),
        "low" => Some(Priority::Low),
        _ => None,
    }
}

/// Parse a stored timestamp. The widget's own format comes first; ISO forms
/// are accepted for documents edited by other tools.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        TIMESTAMP_FORMAT,
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    let s = s.trim();
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
}

pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::{parse_timestamp, TIMESTAMP_FORMAT};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        use super::super::{parse_timestamp, TIMESTAMP_FORMAT};

        pub fn serialize<S: Serializer>(
            ts: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.collect_str(&ts.format(TIMESTAMP_FORMAT)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => parse_timestamp(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'"))),
            }
        }
    }
}
