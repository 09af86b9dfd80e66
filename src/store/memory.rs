// src/store/memory.rs

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tracing::debug;

use crate::dag::Stage;
use crate::errors::{PrincessError, Result};
use crate::store::{StageStore, StageUpdate};

/// In-memory stage store.
///
/// Clones share the same underlying data, so a test can keep a handle and
/// inspect what a session wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStageStore {
    projects: Arc<Mutex<HashMap<String, Vec<Stage>>>>,
}

impl MemoryStageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or replace) a project's stages.
    pub fn with_project(self, project: &str, stages: Vec<Stage>) -> Self {
        if let Ok(mut guard) = self.projects.lock() {
            guard.insert(project.to_string(), stages);
        }
        self
    }

    /// Copy of the stored stages of `project`.
    pub fn stages(&self, project: &str) -> Option<Vec<Stage>> {
        self.projects.lock().ok()?.get(project).cloned()
    }

    fn load_now(&self, project: &str) -> Result<Vec<Stage>> {
        let guard = self
            .projects
            .lock()
            .map_err(|_| anyhow!("memory stage store lock poisoned"))?;
        guard
            .get(project)
            .cloned()
            .ok_or_else(|| PrincessError::ConfigError(format!("unknown project '{project}'")))
    }

    fn update_now(&self, project: &str, updates: &[StageUpdate]) -> Result<()> {
        let mut guard = self
            .projects
            .lock()
            .map_err(|_| anyhow!("memory stage store lock poisoned"))?;
        let stages = guard
            .get_mut(project)
            .ok_or_else(|| PrincessError::ConfigError(format!("unknown project '{project}'")))?;

        if let Some(missing) = updates
            .iter()
            .find(|u| !stages.iter().any(|s| s.id == u.stage_id))
        {
            return Err(PrincessError::StageNotFound(missing.stage_id.clone()));
        }

        for update in updates {
            if let Some(stage) = stages.iter_mut().find(|s| s.id == update.stage_id) {
                stage.start_date = update.start_date;
                stage.end_date = update.end_date;
            }
        }

        debug!(project, updates = updates.len(), "memory store updated");
        Ok(())
    }
}

impl StageStore for MemoryStageStore {
    fn load_stages(
        &mut self,
        project: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stage>>> + Send + '_>> {
        let result = self.load_now(project);
        Box::pin(async move { result })
    }

    fn update_stages(
        &mut self,
        project: &str,
        updates: Vec<StageUpdate>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let result = self.update_now(project, &updates);
        Box::pin(async move { result })
    }
}
