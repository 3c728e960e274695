//! Task snapshot sources.
//!
//! The engine never owns task persistence; it re-reads the collection
//! from a [`TaskSource`] at the start of every tick and works against
//! that snapshot.

use crate::error::{NotifyError, Result};
use crate::model::Task;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Provider of the current task collection.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Load the current task collection.
    async fn load(&self) -> Result<Vec<Task>>;
}

/// Task snapshot read from a JSON file holding an array of tasks.
///
/// A missing file is an empty collection; a malformed file is an error
/// (the engine keeps its previous snapshot in that case).
pub struct JsonFileTaskSource {
    path: PathBuf,
}

impl JsonFileTaskSource {
    /// Create a source reading from `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl TaskSource for JsonFileTaskSource {
    async fn load(&self) -> Result<Vec<Task>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(NotifyError::Tasks(format!(
                    "cannot read task file {}: {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            NotifyError::Tasks(format!(
                "cannot parse task file {}: {e}",
                self.path.display()
            ))
        })
    }
}

/// In-memory task collection shared with an embedding host.
///
/// The host mutates the collection through the shared handle; the engine
/// sees the new state on its next tick.
#[derive(Clone)]
pub struct InMemoryTaskSource {
    tasks: Arc<Mutex<Vec<Task>>>,
}

impl InMemoryTaskSource {
    /// Create a source holding `initial` tasks.
    #[must_use]
    pub fn new(initial: Vec<Task>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(initial)),
        }
    }

    /// Shared handle for host-side mutation.
    #[must_use]
    pub fn handle(&self) -> Arc<Mutex<Vec<Task>>> {
        Arc::clone(&self.tasks)
    }

    /// Replace the whole collection.
    pub fn set_tasks(&self, tasks: Vec<Task>) {
        let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        *guard = tasks;
    }
}

#[async_trait]
impl TaskSource for InMemoryTaskSource {
    async fn load(&self) -> Result<Vec<Task>> {
        let guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}
