/*
Day view projection.
Pure functions from the task collection to what one calendar day shows.
Module was independently written from HTTP / Axum for testing
*/

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Priority, Task};

// Extra filters narrowing the active list only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub priority: Option<Priority>,
    pub tag: Option<String>,
}

impl ViewFilter {
    fn admits(&self, task: &Task) -> bool {
        let priority_ok = self.priority.is_none_or(|p| task.priority == p);
        let tag_ok = self.tag.as_deref().is_none_or(|tag| task.has_tag(tag));
        priority_ok && tag_ok
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub is_today: bool,
    pub active: Vec<Task>,    // high -> medium -> low, otherwise collection order
    pub completed: Vec<Task>, // collection order
}

// Visibility rule:
// - today shows undated tasks, tasks due today, and everything overdue
// - any other day shows exact due-date matches only
pub fn is_visible_on(task: &Task, selected: NaiveDate, today: NaiveDate) -> bool {
    if selected == today {
        task.due_date.is_none_or(|due| due <= today)
    } else {
        task.due_date == Some(selected)
    }
}

/// Project the collection onto `selected`, split into active and
/// completed. `filter` applies to the active list only.
pub fn day_view(
    tasks: &[Task],
    selected: NaiveDate,
    today: NaiveDate,
    filter: &ViewFilter,
) -> DayView {
    let (completed, mut active): (Vec<Task>, Vec<Task>) = tasks
        .iter()
        .filter(|t| is_visible_on(t, selected, today))
        .cloned()
        .partition(Task::is_done);

    active.retain(|t| filter.admits(t));
    // stable: equal priorities keep collection order
    active.sort_by_key(|t| t.priority);

    DayView {
        date: selected,
        is_today: selected == today,
        active,
        completed,
    }
}
