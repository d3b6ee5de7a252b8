//! The host-scheduler boundary.
//!
//! [`TaskBackend`] is the folder/task primitive surface a native scheduler
//! engine offers: list, register (create-or-replace), delete, enable. Task
//! names are unique case-insensitively. [`DirBackend`] persists one JSON file
//! per task and is the shipping implementation; [`MemoryBackend`] backs tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::trigger::Trigger;
use crate::{Result, SchedulerError};

/// A registered task as the host scheduler sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    /// Free-text description field; carries the metadata envelope.
    pub description: String,
    pub enabled: bool,
    pub triggers: Vec<Trigger>,
    /// Command line the scheduler runs when a trigger fires.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Local>>,
    #[serde(default)]
    pub running: bool,
}

pub trait TaskBackend: Send + Sync {
    fn list(&self) -> Result<Vec<TaskDefinition>>;
    fn get(&self, name: &str) -> Result<Option<TaskDefinition>>;
    /// Create or replace a task under its (case-insensitive) name.
    fn register(&self, task: &TaskDefinition) -> Result<()>;
    /// Remove a task. Returns false when no such task existed.
    fn delete(&self, name: &str) -> Result<bool>;
    /// Flip the enabled bit without touching anything else.
    fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool>;
}

/// Directory-of-JSON-files backend: one `<key>.task.json` per task.
pub struct DirBackend {
    dir: PathBuf,
}

impl DirBackend {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.task.json", file_key(name)))
    }

    fn read_task(&self, path: &std::path::Path) -> Result<TaskDefinition> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl TaskBackend for DirBackend {
    fn list(&self) -> Result<Vec<TaskDefinition>> {
        let mut tasks = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.to_string_lossy().ends_with(".task.json") {
                continue;
            }
            match self.read_task(&path) {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    tracing::warn!("Skipping unreadable task file {}: {e}", path.display());
                }
            }
        }
        tasks.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(tasks)
    }

    fn get(&self, name: &str) -> Result<Option<TaskDefinition>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(self.read_task(&path)?))
    }

    fn register(&self, task: &TaskDefinition) -> Result<()> {
        let content = serde_json::to_string_pretty(task)?;
        std::fs::write(self.path_for(&task.name), content)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool> {
        match self.get(name)? {
            Some(mut task) => {
                task.enabled = enabled;
                self.register(&task)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory backend for tests.
#[derive(Default)]
pub struct MemoryBackend {
    tasks: Mutex<HashMap<String, TaskDefinition>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskBackend for MemoryBackend {
    fn list(&self) -> Result<Vec<TaskDefinition>> {
        let tasks = self.tasks.lock().map_err(poisoned)?;
        let mut all: Vec<TaskDefinition> = tasks.values().cloned().collect();
        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(all)
    }

    fn get(&self, name: &str) -> Result<Option<TaskDefinition>> {
        let tasks = self.tasks.lock().map_err(poisoned)?;
        Ok(tasks.get(&file_key(name)).cloned())
    }

    fn register(&self, task: &TaskDefinition) -> Result<()> {
        let mut tasks = self.tasks.lock().map_err(poisoned)?;
        tasks.insert(file_key(&task.name), task.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let mut tasks = self.tasks.lock().map_err(poisoned)?;
        Ok(tasks.remove(&file_key(name)).is_some())
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool> {
        let mut tasks = self.tasks.lock().map_err(poisoned)?;
        match tasks.get_mut(&file_key(name)) {
            Some(task) => {
                task.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> SchedulerError {
    SchedulerError::Backend("task map lock poisoned".into())
}

/// Case-insensitive, filesystem-safe key for a task name.
fn file_key(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
