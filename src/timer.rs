//! Per-task time tracking.
//!
//! At most one task runs at a time. Every one-second tick adds to the
//! running task's resettable `time_spent` counter and to the permanent
//! per-day `time_log` under the date the tick fired on, so a session
//! across midnight splits between two days on its own.

use chrono::NaiveDate;

use crate::error::TaskError;
use crate::models::Task;

fn find_mut(tasks: &mut [Task], id: u64) -> Result<&mut Task, TaskError> {
    tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or(TaskError::NotFound(id))
}

/// Start `id`'s timer, stopping whichever other timer was running.
pub fn start(tasks: &mut [Task], id: u64) -> Result<(), TaskError> {
    if !tasks.iter().any(|t| t.id == id) {
        return Err(TaskError::NotFound(id));
    }
    for t in tasks.iter_mut() {
        t.is_running = t.id == id;
    }
    Ok(())
}

pub fn stop(tasks: &mut [Task], id: u64) -> Result<(), TaskError> {
    find_mut(tasks, id)?.is_running = false;
    Ok(())
}

// Returns whether the timer is running afterwards.
pub fn toggle(tasks: &mut [Task], id: u64) -> Result<bool, TaskError> {
    if find_mut(tasks, id)?.is_running {
        stop(tasks, id)?;
        Ok(false)
    } else {
        start(tasks, id)?;
        Ok(true)
    }
}

/// Zero the running total and stop the timer. `time_log` is history and
/// is left alone.
pub fn reset(tasks: &mut [Task], id: u64) -> Result<(), TaskError> {
    let t = find_mut(tasks, id)?;
    t.time_spent = 0;
    t.is_running = false;
    Ok(())
}

/// One second elapsed on `today`. Returns how many tasks accrued.
pub fn tick(tasks: &mut [Task], today: NaiveDate) -> usize {
    let mut ticked = 0;
    for t in tasks.iter_mut().filter(|t| t.is_running) {
        t.time_spent += 1;
        *t.time_log.entry(today).or_insert(0) += 1;
        ticked += 1;
    }
    ticked
}

pub fn running(tasks: &[Task]) -> Option<&Task> {
    tasks.iter().find(|t| t.is_running)
}
