// --------------------------------------------------
// In-memory workspace owned by the controller.
//
// Holds the single task collection and the settings document.
// Every mutation goes through here and is persisted at once;
// timer ticks are the exception and are flushed by autosave,
// timer stop/reset and shutdown.
// --------------------------------------------------

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::{StoreResult, TaskError};
use crate::logic::{self, DayView, ViewFilter};
use crate::models::{local_now, next_task_id, Priority, RepeatType, Task, TaskStatus};
use crate::recurrence::{self, RecurrenceReport};
use crate::settings::{Settings, SettingsStore};
use crate::store::TaskStore;
use crate::timer;

pub type SharedState = Arc<Mutex<Workspace>>;

// User-editable fields of a task, already parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub repeat_type: Option<RepeatType>,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        TaskDraft {
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
            due_date: None,
            repeat_type: None,
            tags: Vec::new(),
        }
    }

    // Trimmed title must be non-empty; tags are trimmed and de-duplicated.
    fn normalized(mut self) -> Result<Self, TaskError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        self.tags = tags;
        Ok(self)
    }
}

pub struct Workspace {
    tasks: Vec<Task>,
    settings: Settings,
    store: TaskStore,
    settings_store: SettingsStore,
    unsaved_ticks: u64,
    clock: fn() -> NaiveDateTime,
}

impl Workspace {
    pub fn new(store: TaskStore, settings_store: SettingsStore, now: NaiveDateTime) -> Self {
        let tasks = store.load_or_default(now);
        let settings = settings_store.load_or_default();
        info!(tasks = tasks.len(), path = %store.path().display(), "workspace loaded");
        Workspace {
            tasks,
            settings,
            store,
            settings_store,
            unsaved_ticks: 0,
            clock: local_now,
        }
    }

    // Replaces the wall clock the handlers and the ticker read.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn open(data_dir: &Path, now: NaiveDateTime) -> Self {
        Workspace::new(
            TaskStore::in_dir(data_dir),
            SettingsStore::in_dir(data_dir),
            now,
        )
    }

    /// Session start: spawn due recurring occurrences and persist them.
    /// Runs once; date navigation afterwards never re-runs it.
    pub fn start_session(
        &mut self,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> StoreResult<RecurrenceReport> {
        let report = recurrence::spawn_due_occurrences(&mut self.tasks, today, now);
        if !report.is_empty() {
            info!(created = report.created.len(), "spawned recurring occurrences");
            self.persist()?;
        }
        Ok(report)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn view(&self, selected: NaiveDate, today: NaiveDate, filter: &ViewFilter) -> DayView {
        logic::day_view(&self.tasks, selected, today, filter)
    }

    pub fn create_task(&mut self, draft: TaskDraft, now: NaiveDateTime) -> Result<Task, TaskError> {
        let draft = draft.normalized()?;
        let id = next_task_id(&self.tasks).ok_or_else(|| {
            TaskError::IdsExhausted(self.tasks.iter().map(|t| t.id).max().unwrap_or_default())
        })?;
        let mut task = Task::new(id, draft.title, now);
        task.description = draft.description;
        task.priority = draft.priority;
        task.due_date = draft.due_date;
        task.repeat_type = draft.repeat_type;
        task.tags = draft.tags;

        self.tasks.push(task.clone());
        self.persist()?;
        self.remember_tags(&task.tags);
        Ok(task)
    }

    pub fn update_task(&mut self, id: u64, draft: TaskDraft) -> Result<Task, TaskError> {
        let draft = draft.normalized()?;
        let t = self.find_mut(id)?;
        t.title = draft.title;
        t.description = draft.description;
        t.priority = draft.priority;
        t.due_date = draft.due_date;
        t.repeat_type = draft.repeat_type;
        t.tags = draft.tags;
        let updated = t.clone();

        self.persist()?;
        self.remember_tags(&updated.tags);
        Ok(updated)
    }

    pub fn delete_task(&mut self, id: u64) -> Result<(), TaskError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(TaskError::NotFound(id));
        }
        self.persist()?;
        Ok(())
    }

    pub fn toggle_status(&mut self, id: u64, now: NaiveDateTime) -> Result<Task, TaskError> {
        let t = self.find_mut(id)?;
        t.toggle_status(now);
        let updated = t.clone();
        self.persist()?;
        Ok(updated)
    }

    pub fn set_status(
        &mut self,
        id: u64,
        status: TaskStatus,
        now: NaiveDateTime,
    ) -> Result<Task, TaskError> {
        let t = self.find_mut(id)?;
        t.set_status(status, now);
        let updated = t.clone();
        self.persist()?;
        Ok(updated)
    }

    pub fn toggle_timer(&mut self, id: u64) -> Result<Task, TaskError> {
        timer::toggle(&mut self.tasks, id)?;
        self.persist()?;
        self.snapshot(id)
    }

    pub fn reset_timer(&mut self, id: u64) -> Result<Task, TaskError> {
        timer::reset(&mut self.tasks, id)?;
        self.persist()?;
        self.snapshot(id)
    }

    // Accrues in memory only; see `needs_autosave`.
    pub fn tick(&mut self, today: NaiveDate) -> usize {
        let ticked = timer::tick(&mut self.tasks, today);
        if ticked > 0 {
            self.unsaved_ticks += 1;
        }
        ticked
    }

    pub fn needs_autosave(&self, every_secs: u64) -> bool {
        every_secs > 0 && self.unsaved_ticks >= every_secs
    }

    /// Save once `every_secs` running ticks have accrued. A failed save
    /// restarts the count, so the next attempt waits a full interval.
    pub fn autosave(&mut self, every_secs: u64) -> bool {
        if !self.needs_autosave(every_secs) {
            return false;
        }
        if self.persist().is_err() {
            self.unsaved_ticks = 0;
            return false;
        }
        true
    }

    pub fn update_settings(&mut self, updates: Map<String, Value>) -> StoreResult<Value> {
        self.settings.merge(updates);
        self.persist_settings()?;
        Ok(self.settings.to_json())
    }

    pub fn register_tag(&mut self, tag: &str) -> Result<Vec<String>, TaskError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(TaskError::EmptyTag);
        }
        if self.settings.register_tags([tag]) {
            self.persist_settings()?;
        }
        Ok(self.settings.all_tags())
    }

    /// Write the task collection. Failures are logged and returned; the
    /// in-memory state is kept so the next successful save catches up.
    pub fn persist(&mut self) -> StoreResult<()> {
        match self.store.save(&self.tasks) {
            Ok(()) => {
                self.unsaved_ticks = 0;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to save tasks");
                Err(e)
            }
        }
    }

    fn persist_settings(&self) -> StoreResult<()> {
        self.settings_store.save(&self.settings).inspect_err(|e| {
            error!(error = %e, "failed to save settings");
        })
    }

    // The task is already saved; a registry failure is logged, not returned.
    fn remember_tags(&mut self, tags: &[String]) {
        if self.settings.register_tags(tags.iter().map(String::as_str)) {
            let _ = self.persist_settings();
        }
    }

    fn find_mut(&mut self, id: u64) -> Result<&mut Task, TaskError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))
    }

    fn snapshot(&self, id: u64) -> Result<Task, TaskError> {
        self.task(id).cloned().ok_or(TaskError::NotFound(id))
    }
}

/// Drive the one-second timer for as long as the process lives.
///
/// Each tick reads the local date at the moment it fires. While a timer
/// runs, the collection is saved every `autosave_secs` ticks.
pub async fn run_ticker(state: SharedState, autosave_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        let mut ws = state.lock().await;
        let today = ws.now().date();
        ws.tick(today);
        ws.autosave(autosave_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{at, date};
    use crate::settings::SETTINGS_FILE;
    use crate::store::TASKS_FILE;

    fn now() -> NaiveDateTime {
        at("2024-06-10 12:00")
    }

    fn workspace(dir: &Path) -> Workspace {
        Workspace::open(dir, now())
    }

    fn reload(dir: &Path) -> Vec<Task> {
        TaskStore::in_dir(dir).load(now()).unwrap()
    }

    #[test]
    fn create_assigns_increasing_ids_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());

        let a = ws.create_task(TaskDraft::titled("first"), now()).unwrap();
        let b = ws.create_task(TaskDraft::titled(" second "), now()).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(b.title, "second");
        assert_eq!(a.status, TaskStatus::NotDone);
        assert_eq!(a.created, now());
        assert_eq!(a.time_spent, 0);
        assert!(!a.is_running);
        assert_eq!(reload(dir.path()), vec![a, b]);
    }

    #[test]
    fn ids_are_not_reused_below_the_max() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        for title in ["a", "b", "c"] {
            ws.create_task(TaskDraft::titled(title), now()).unwrap();
        }
        ws.delete_task(1).unwrap();
        let d = ws.create_task(TaskDraft::titled("d"), now()).unwrap();
        assert_eq!(d.id, 4);
        assert!(matches!(ws.delete_task(1), Err(TaskError::NotFound(1))));
    }

    #[test]
    fn blank_title_is_rejected_before_construction() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        assert!(matches!(
            ws.create_task(TaskDraft::titled("   "), now()),
            Err(TaskError::EmptyTitle)
        ));
        assert!(ws.tasks().is_empty());
        assert!(!dir.path().join(TASKS_FILE).exists());
    }

    #[test]
    fn tags_are_registered_cumulatively() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let mut draft = TaskDraft::titled("pack");
        draft.tags = vec!["travel".into(), " travel ".into(), "home".into()];
        let t = ws.create_task(draft, now()).unwrap();
        assert_eq!(t.tags, vec!["travel", "home"]);

        let mut edit = TaskDraft::titled("pack");
        edit.tags = Vec::new();
        ws.update_task(t.id, edit).unwrap();

        let settings = SettingsStore::in_dir(dir.path()).load().unwrap();
        assert_eq!(settings.all_tags(), vec!["travel", "home"]);
        assert!(dir.path().join(SETTINGS_FILE).exists());
    }

    #[test]
    fn session_start_spawns_and_persists_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let mut draft = TaskDraft::titled("stretch");
        draft.due_date = Some(date("2024-06-09"));
        draft.repeat_type = Some(RepeatType::Daily);
        ws.create_task(draft, at("2024-06-09 08:00")).unwrap();

        let report = ws.start_session(date("2024-06-10"), now()).unwrap();
        assert_eq!(report.created, vec![2]);

        let mut reopened = workspace(dir.path());
        assert_eq!(reopened.tasks().len(), 2);
        assert_eq!(reopened.tasks()[0].last_repeated_date, Some(date("2024-06-10")));
        assert!(reopened.start_session(date("2024-06-10"), now()).unwrap().is_empty());
    }

    #[test]
    fn status_toggle_round_trips_completion_date() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let t = ws.create_task(TaskDraft::titled("ship"), now()).unwrap();

        let done = ws.toggle_status(t.id, at("2024-06-10 17:45")).unwrap();
        assert_eq!(done.completion_date, Some(at("2024-06-10 17:45")));
        assert_eq!(reload(dir.path())[0].status, TaskStatus::Done);

        let back = ws.set_status(t.id, TaskStatus::NotDone, now()).unwrap();
        assert_eq!(back.completion_date, None);
    }

    #[test]
    fn timer_toggle_keeps_one_runner_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let a = ws.create_task(TaskDraft::titled("a"), now()).unwrap();
        let b = ws.create_task(TaskDraft::titled("b"), now()).unwrap();

        assert!(ws.toggle_timer(a.id).unwrap().is_running);
        assert!(ws.toggle_timer(b.id).unwrap().is_running);
        assert!(!ws.task(a.id).unwrap().is_running);

        for _ in 0..5 {
            assert_eq!(ws.tick(date("2024-06-10")), 1);
        }
        let stopped = ws.toggle_timer(b.id).unwrap();
        assert!(!stopped.is_running);

        let on_disk = reload(dir.path());
        assert_eq!(on_disk[1].time_spent, 5);
        assert_eq!(on_disk[1].time_log[&date("2024-06-10")], 5);
    }

    #[test]
    fn autosave_threshold_counts_running_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let a = ws.create_task(TaskDraft::titled("a"), now()).unwrap();
        ws.tick(date("2024-06-10"));
        assert!(!ws.needs_autosave(1));

        ws.toggle_timer(a.id).unwrap();
        ws.tick(date("2024-06-10"));
        assert!(!ws.needs_autosave(2));
        ws.tick(date("2024-06-10"));
        assert!(ws.needs_autosave(2));
        assert!(!ws.needs_autosave(0));

        ws.persist().unwrap();
        assert!(!ws.needs_autosave(2));
        assert_eq!(reload(dir.path())[0].time_spent, 2);
    }

    #[test]
    fn reset_persists_and_keeps_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let a = ws.create_task(TaskDraft::titled("a"), now()).unwrap();
        ws.toggle_timer(a.id).unwrap();
        ws.tick(date("2024-06-10"));
        ws.tick(date("2024-06-10"));

        let reset = ws.reset_timer(a.id).unwrap();
        assert_eq!(reset.time_spent, 0);
        assert!(!reset.is_running);
        assert_eq!(reload(dir.path())[0].time_log[&date("2024-06-10")], 2);
    }

    #[test]
    fn save_failure_surfaces_and_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory where the document should be makes rename fail
        let blocked = dir.path().join("tasks");
        std::fs::create_dir_all(blocked.join("inner")).unwrap();
        let mut ws = Workspace::new(
            TaskStore::new(&blocked),
            SettingsStore::in_dir(dir.path()),
            now(),
        );

        let err = ws.create_task(TaskDraft::titled("kept"), now()).unwrap_err();
        assert!(matches!(err, TaskError::Store(_)));
        assert_eq!(ws.tasks().len(), 1);
    }

    #[test]
    fn settings_merge_and_tag_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let mut updates = Map::new();
        updates.insert("sounds_enabled".into(), Value::Bool(false));
        let json = ws.update_settings(updates).unwrap();
        assert_eq!(json["sounds_enabled"], false);

        assert_eq!(ws.register_tag(" focus ").unwrap(), vec!["focus"]);
        assert!(matches!(ws.register_tag(" "), Err(TaskError::EmptyTag)));

        let reopened = workspace(dir.path());
        assert!(!reopened.settings().sounds_enabled());
        assert_eq!(reopened.settings().all_tags(), vec!["focus"]);
    }

    #[test]
    fn tag_registry_failure_does_not_block_task_saves() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("settings");
        std::fs::create_dir_all(blocked.join("inner")).unwrap();
        let mut ws = Workspace::new(
            TaskStore::in_dir(dir.path()),
            SettingsStore::new(&blocked),
            now(),
        );

        let mut draft = TaskDraft::titled("plain");
        draft.tags = vec!["work".into()];
        let t = ws.create_task(draft, now()).unwrap();
        assert_eq!(ws.tasks().len(), 1);

        let mut edit = TaskDraft::titled("renamed");
        edit.tags = vec!["home".into()];
        ws.update_task(t.id, edit).unwrap();
        assert_eq!(reload(dir.path())[0].title, "renamed");
        assert_eq!(reload(dir.path())[0].tags, vec!["home"]);

        assert!(matches!(ws.register_tag("later"), Err(TaskError::Store(_))));
    }

    #[test]
    fn failed_autosave_waits_a_full_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let a = ws.create_task(TaskDraft::titled("a"), now()).unwrap();
        ws.toggle_timer(a.id).unwrap();

        // block the document path so the next save fails
        std::fs::remove_file(dir.path().join(TASKS_FILE)).unwrap();
        std::fs::create_dir_all(dir.path().join(TASKS_FILE).join("inner")).unwrap();

        ws.tick(date("2024-06-10"));
        ws.tick(date("2024-06-10"));
        assert!(!ws.autosave(2));
        assert!(!ws.needs_autosave(2));

        ws.tick(date("2024-06-10"));
        assert!(!ws.needs_autosave(2));
        ws.tick(date("2024-06-10"));
        assert!(ws.needs_autosave(2));
        assert_eq!(ws.task(a.id).unwrap().time_spent, 4);
    }

    #[test]
    fn autosave_saves_once_threshold_is_reached() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let a = ws.create_task(TaskDraft::titled("a"), now()).unwrap();
        ws.toggle_timer(a.id).unwrap();

        ws.tick(date("2024-06-10"));
        assert!(!ws.autosave(2));
        ws.tick(date("2024-06-10"));
        assert!(ws.autosave(2));
        assert_eq!(reload(dir.path())[0].time_spent, 2);
    }

    #[test]
    fn create_fails_cleanly_when_ids_run_out() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(TASKS_FILE),
            r#"[{"id": 18446744073709551615, "title": "edited by hand", "created": "01.06.2024 09:00"}]"#,
        )
        .unwrap();
        let mut ws = workspace(dir.path());
        assert_eq!(ws.tasks().len(), 1);

        let err = ws.create_task(TaskDraft::titled("one more"), now()).unwrap_err();
        assert!(matches!(err, TaskError::IdsExhausted(u64::MAX)));
        assert_eq!(ws.tasks().len(), 1);
    }

    #[test]
    fn clock_is_replaceable() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path()).with_clock(now);
        assert_eq!(ws.now(), at("2024-06-10 12:00"));
    }
}
