// src/store/mod.rs

//! Pluggable persistence for stage data.
//!
//! The scheduling session talks to a `StageStore` instead of a concrete
//! database. Stages are loaded once per session and committed dates are
//! written back as one [`StageUpdate`] per touched stage.
//!
//! - [`MemoryStageStore`] keeps projects in memory (embedding, tests).
//! - [`ProjectFileStore`] reads and rewrites a TOML project file.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dag::Stage;
use crate::dag::stage::StageId;
use crate::errors::Result;

pub mod memory;
pub mod project_file;

pub use memory::MemoryStageStore;
pub use project_file::ProjectFileStore;

/// New dates for one stage, as handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageUpdate {
    pub stage_id: StageId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<&Stage> for StageUpdate {
    fn from(stage: &Stage) -> Self {
        Self {
            stage_id: stage.id.clone(),
            start_date: stage.start_date,
            end_date: stage.end_date,
        }
    }
}

/// Trait abstracting where stages live.
pub trait StageStore: Send {
    /// Load every stage of `project`.
    fn load_stages(
        &mut self,
        project: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stage>>> + Send + '_>>;

    /// Persist new dates. The batch is applied entirely or not at all.
    fn update_stages(
        &mut self,
        project: &str,
        updates: Vec<StageUpdate>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
