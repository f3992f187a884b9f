/*
Recurring task generation.
Runs once per session start: each repeating task whose next occurrence
has arrived spawns at most one successor per pass.
*/

use std::collections::HashSet;

use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::models::{next_task_id, RepeatType, Task, TaskStatus};

// What a single pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceReport {
    pub created: Vec<u64>,   // ids of spawned successors
    pub duplicates: usize,   // occurrences suppressed as already present
}

impl RecurrenceReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }
}

/// Date the task would next fire on, or None when it does not repeat.
///
/// Done tasks and tasks without a due date never fire: completing a
/// repeating task pauses its series.
pub fn next_occurrence(task: &Task) -> Option<NaiveDate> {
    let repeat = task.repeat_type?;
    if task.is_done() {
        return None;
    }
    let due = task.due_date?;
    let anchor = task.last_repeated_date.unwrap_or(due);
    anchor.checked_add_days(Days::new(repeat.step_days()))
}

/// Append every successor that is due on or before `today`.
///
/// Occurrences are de-duplicated by `(due date, title)` across the whole
/// collection, successors from this pass included. Only the origin's
/// bookkeeping advances: daily series anchor on the successor's date,
/// weekly and monthly series on `today`.
pub fn spawn_due_occurrences(
    tasks: &mut Vec<Task>,
    today: NaiveDate,
    now: NaiveDateTime,
) -> RecurrenceReport {
    let mut seen: HashSet<(NaiveDate, String)> = tasks
        .iter()
        .filter(|t| !t.title.is_empty())
        .filter_map(|t| Some((t.due_date?, t.title.clone())))
        .collect();

    let first_id = next_task_id(tasks);
    let mut spawned: Vec<Task> = Vec::new();
    let mut report = RecurrenceReport::default();

    for origin in tasks.iter_mut() {
        let Some(next) = next_occurrence(origin) else {
            continue;
        };
        if next > today {
            continue;
        }
        let Some(repeat) = origin.repeat_type else {
            continue;
        };

        let key = (next, origin.title.clone());
        if seen.contains(&key) {
            debug!(origin = origin.id, %next, "occurrence already present");
            report.duplicates += 1;
            continue;
        }

        let Some(id) = first_id.and_then(|first| first.checked_add(spawned.len() as u64)) else {
            warn!(origin = origin.id, "task ids exhausted, no more occurrences");
            break;
        };
        spawned.push(successor_of(origin, id, next, now));
        seen.insert(key);

        origin.last_repeated_date = Some(match repeat {
            RepeatType::Daily => next,
            RepeatType::Weekly | RepeatType::Monthly => today,
        });
        debug!(origin = origin.id, successor = id, %next, "spawned occurrence");
        report.created.push(id);
    }

    tasks.extend(spawned);
    report
}

// Successors start their own chain: no bookkeeping, no tracked time.
fn successor_of(origin: &Task, id: u64, due: NaiveDate, now: NaiveDateTime) -> Task {
    let mut t = Task::new(id, origin.title.clone(), now);
    t.description = origin.description.clone();
    t.priority = origin.priority;
    t.status = TaskStatus::NotDone;
    t.due_date = Some(due);
    t.repeat_type = origin.repeat_type;
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{at, date, task};
    use crate::models::Priority;

    fn now() -> NaiveDateTime {
        at("2024-06-04 08:00")
    }

    fn repeating(id: u64, title: &str, due: &str, repeat: RepeatType) -> Task {
        let mut t = task(id, title);
        t.due_date = Some(date(due));
        t.repeat_type = Some(repeat);
        t
    }

    #[test]
    fn daily_catch_up_advances_one_step_per_pass() {
        let mut tasks = vec![repeating(1, "stretch", "2024-06-01", RepeatType::Daily)];
        let today = date("2024-06-04");

        let report = spawn_due_occurrences(&mut tasks, today, now());
        assert_eq!(report.created, vec![2]);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].due_date, Some(date("2024-06-02")));
        assert_eq!(tasks[0].last_repeated_date, Some(date("2024-06-02")));

        spawn_due_occurrences(&mut tasks, today, now());
        assert_eq!(tasks[0].last_repeated_date, Some(date("2024-06-03")));
        assert!(tasks.iter().any(|t| t.due_date == Some(date("2024-06-03"))));
    }

    #[test]
    fn successor_copies_template_fields_only() {
        let mut origin = repeating(5, "review", "2024-06-01", RepeatType::Daily);
        origin.description = "inbox zero".into();
        origin.priority = Priority::High;
        origin.time_spent = 300;
        origin.tags = vec!["work".into()];
        let mut tasks = vec![origin];

        spawn_due_occurrences(&mut tasks, date("2024-06-02"), now());
        let s = &tasks[1];
        assert_eq!(s.id, 6);
        assert_eq!(s.title, "review");
        assert_eq!(s.description, "inbox zero");
        assert_eq!(s.priority, Priority::High);
        assert_eq!(s.repeat_type, Some(RepeatType::Daily));
        assert_eq!(s.status, TaskStatus::NotDone);
        assert_eq!(s.created, now());
        assert_eq!(s.last_repeated_date, None);
        assert_eq!(s.time_spent, 0);
        assert!(s.tags.is_empty());
    }

    #[test]
    fn caught_up_series_is_idempotent() {
        let today = date("2024-06-10");
        let mut tasks = vec![
            repeating(1, "water plants", "2024-06-09", RepeatType::Daily),
            repeating(2, "weekly sync", "2024-06-01", RepeatType::Weekly),
            repeating(3, "pay rent", "2024-05-01", RepeatType::Monthly),
        ];

        let first = spawn_due_occurrences(&mut tasks, today, now());
        assert_eq!(first.created.len(), 3);
        let after_first = tasks.clone();

        let second = spawn_due_occurrences(&mut tasks, today, now());
        assert!(second.is_empty());
        assert_eq!(tasks, after_first);
    }

    #[test]
    fn weekly_and_monthly_anchor_on_today() {
        let today = date("2024-06-10");
        let mut tasks = vec![
            repeating(1, "weekly sync", "2024-06-01", RepeatType::Weekly),
            repeating(2, "pay rent", "2024-05-01", RepeatType::Monthly),
        ];
        spawn_due_occurrences(&mut tasks, today, now());

        assert_eq!(tasks[2].due_date, Some(date("2024-06-08")));
        assert_eq!(tasks[3].due_date, Some(date("2024-05-31")));
        assert_eq!(tasks[0].last_repeated_date, Some(today));
        assert_eq!(tasks[1].last_repeated_date, Some(today));
    }

    #[test]
    fn completed_series_does_not_recur() {
        let mut t = repeating(1, "weekly sync", "2024-01-01", RepeatType::Weekly);
        t.set_status(TaskStatus::Done, at("2024-01-01 10:00"));
        let mut tasks = vec![t];

        let report = spawn_due_occurrences(&mut tasks, date("2024-12-31"), now());
        assert!(report.is_empty());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].last_repeated_date, None);
    }

    #[test]
    fn undated_or_future_tasks_do_not_fire() {
        let mut undated = task(1, "someday");
        undated.repeat_type = Some(RepeatType::Daily);
        let future = repeating(2, "later", "2024-06-10", RepeatType::Daily);
        let plain = {
            let mut t = task(3, "once");
            t.due_date = Some(date("2024-05-01"));
            t
        };
        let mut tasks = vec![undated, future, plain];

        assert!(spawn_due_occurrences(&mut tasks, date("2024-06-10"), now()).is_empty());
        assert_eq!(tasks.len(), 3);
    }

    #[test]
    fn same_title_and_date_counts_as_duplicate() {
        let mut manual = task(7, "stretch");
        manual.due_date = Some(date("2024-06-02"));
        let mut tasks = vec![repeating(1, "stretch", "2024-06-01", RepeatType::Daily), manual];

        let report = spawn_due_occurrences(&mut tasks, date("2024-06-04"), now());
        assert!(report.is_empty());
        assert_eq!(report.duplicates, 1);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].last_repeated_date, None);
    }

    #[test]
    fn duplicates_within_one_pass_are_suppressed() {
        let mut tasks = vec![
            repeating(1, "stand-up", "2024-06-01", RepeatType::Weekly),
            repeating(2, "stand-up", "2024-06-01", RepeatType::Weekly),
        ];
        let report = spawn_due_occurrences(&mut tasks, date("2024-06-10"), now());
        assert_eq!(report.created, vec![3]);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn monthly_is_a_flat_thirty_days() {
        let t = repeating(1, "invoice", "2024-01-31", RepeatType::Monthly);
        assert_eq!(next_occurrence(&t), Some(date("2024-03-01")));
    }

    #[test]
    fn exhausted_ids_stop_the_pass_without_bookkeeping() {
        let mut tasks = vec![repeating(u64::MAX, "stretch", "2024-06-01", RepeatType::Daily)];
        let report = spawn_due_occurrences(&mut tasks, date("2024-06-04"), now());
        assert!(report.is_empty());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].last_repeated_date, None);
    }
}
