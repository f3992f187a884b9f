use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::{StoreError, StoreResult};
use crate::migrate::migrate_record;
use crate::models::Task;

pub const TASKS_FILE: &str = "tasks.json";

// Durable home of the task collection: one JSON array, rewritten whole.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TaskStore { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        TaskStore::new(dir.join(TASKS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and migrate every record. A missing document is an empty
    /// collection; records that cannot be migrated are skipped.
    pub fn load(&self, now: NaiveDateTime) -> StoreResult<Vec<Task>> {
        let Some(text) = read_document(&self.path)? else {
            return Ok(Vec::new());
        };
        let raw: Value =
            serde_json::from_str(&text).map_err(|e| StoreError::json(&self.path, e))?;
        let Value::Array(records) = raw else {
            return Err(StoreError::Shape {
                path: self.path.clone(),
                expected: "an array of tasks",
            });
        };

        let mut tasks = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match migrate_record(record, now) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(index, error = %e, "skipping unreadable task record"),
            }
        }
        Ok(tasks)
    }

    // Corrupt or unreadable documents degrade to an empty collection.
    pub fn load_or_default(&self, now: NaiveDateTime) -> Vec<Task> {
        self.load(now).unwrap_or_else(|e| {
            error!(error = %e, "failed to load tasks, starting empty");
            Vec::new()
        })
    }

    pub fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        let text =
            serde_json::to_string_pretty(tasks).map_err(|e| StoreError::json(&self.path, e))?;
        write_document(&self.path, &text)
    }
}

// None when the document does not exist yet.
pub(crate) fn read_document(path: &Path) -> StoreResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

// Write to a sibling temp file then rename over the target, so a reader
// never observes a half-written document.
pub(crate) fn write_document(path: &Path, text: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, text).map_err(|e| StoreError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
