// --------------------------------------------------
// Widget settings document.
//
// A flat JSON object of preferences owned by the workspace and
// passed around explicitly. Unknown keys survive a load/save cycle
// so older and newer front ends can share one file.
// --------------------------------------------------

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::error;

use crate::error::{StoreError, StoreResult};
use crate::store::{read_document, write_document};

pub const SETTINGS_FILE: &str = "settings.json";

pub const SOUNDS_ENABLED: &str = "sounds_enabled";
pub const WINDOW_GEOMETRY: &str = "window_geometry";
pub const UI_SCALE: &str = "ui_scale";
pub const WINDOW_OPACITY: &str = "window_opacity";
pub const LAST_THEME: &str = "last_theme";
pub const ALL_TAGS: &str = "all_tags";

fn default_for(key: &str) -> Option<Value> {
    match key {
        SOUNDS_ENABLED => Some(Value::Bool(true)),
        UI_SCALE => Some(Value::from(1.0)),
        WINDOW_OPACITY => Some(Value::from(0.96)),
        ALL_TAGS => Some(Value::Array(Vec::new())),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    pub fn from_map(values: Map<String, Value>) -> Self {
        Settings { values }
    }

    // Stored value, else the key's default.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned().or_else(|| default_for(key))
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn merge(&mut self, updates: Map<String, Value>) {
        for (key, value) in updates {
            self.values.insert(key, value);
        }
    }

    pub fn sounds_enabled(&self) -> bool {
        self.get(SOUNDS_ENABLED)
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    pub fn ui_scale(&self) -> f64 {
        self.get(UI_SCALE).and_then(|v| v.as_f64()).unwrap_or(1.0)
    }

    pub fn window_opacity(&self) -> f64 {
        self.get(WINDOW_OPACITY)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.96)
    }

    pub fn last_theme(&self) -> Option<&str> {
        self.values.get(LAST_THEME).and_then(Value::as_str)
    }

    /// Every tag ever created, in creation order. Survives the tag being
    /// removed from all tasks.
    pub fn all_tags(&self) -> Vec<String> {
        match self.values.get(ALL_TAGS) {
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    // Appends unseen tags; returns whether anything was added.
    pub fn register_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) -> bool {
        let mut known = self.all_tags();
        let before = known.len();
        for tag in tags {
            let tag = tag.trim();
            if !tag.is_empty() && !known.iter().any(|k| k == tag) {
                known.push(tag.to_string());
            }
        }
        if known.len() == before {
            return false;
        }
        self.values.insert(
            ALL_TAGS.to_string(),
            Value::Array(known.into_iter().map(Value::from).collect()),
        );
        true
    }

    // Stored keys plus defaults for the well-known ones, for API responses.
    pub fn to_json(&self) -> Value {
        let mut out = self.values.clone();
        for key in [SOUNDS_ENABLED, UI_SCALE, WINDOW_OPACITY, ALL_TAGS] {
            if !out.contains_key(key) {
                if let Some(v) = default_for(key) {
                    out.insert(key.to_string(), v);
                }
            }
        }
        Value::Object(out)
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        SettingsStore::new(dir.join(SETTINGS_FILE))
    }

    pub fn load(&self) -> StoreResult<Settings> {
        let Some(text) = read_document(&self.path)? else {
            return Ok(Settings::default());
        };
        match serde_json::from_str::<Value>(&text).map_err(|e| StoreError::json(&self.path, e))? {
            Value::Object(values) => Ok(Settings::from_map(values)),
            _ => Err(StoreError::Shape {
                path: self.path.clone(),
                expected: "a settings object",
            }),
        }
    }

    pub fn load_or_default(&self) -> Settings {
        self.load().unwrap_or_else(|e| {
            error!(error = %e, "failed to load settings, using defaults");
            Settings::default()
        })
    }

    pub fn save(&self, settings: &Settings) -> StoreResult<()> {
        let text = serde_json::to_string_pretty(&settings.values)
            .map_err(|e| StoreError::json(&self.path, e))?;
        write_document(&self.path, &text)
    }
}
