// src/engine/session.rs

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SchedulePolicy;
use crate::dag::{CriticalPath, Stage, StageGraph};
use crate::engine::schedule::ScheduleEngine;
use crate::engine::suggest::{suggest, Suggestion};
use crate::engine::ImpactReport;
use crate::errors::{PrincessError, Result};
use crate::store::{StageStore, StageUpdate};

/// What the UI shows for a tentative move: the report plus at most one
/// suggested fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePreview {
    pub report: ImpactReport,
    pub suggestion: Option<Suggestion>,
}

/// Scheduling session for one project.
///
/// This is the async IO shell around [`ScheduleEngine`]: it loads a graph
/// snapshot from a [`StageStore`], runs proposals against it, and on commit
/// writes the touched stages back before adopting the new dates. Commits
/// take `&mut self`, so they are serialized per session.
pub struct SchedulingSession<S: StageStore> {
    project: String,
    graph: StageGraph,
    engine: ScheduleEngine,
    store: S,
}

impl<S: StageStore> fmt::Debug for SchedulingSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulingSession")
            .field("project", &self.project)
            .field("stages", &self.graph.len())
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<S: StageStore> SchedulingSession<S> {
    /// Load `project` from `store` and build its graph.
    pub async fn open(mut store: S, project: &str, policy: SchedulePolicy) -> Result<Self> {
        let stages = store.load_stages(project).await?;
        let graph = StageGraph::build(stages)?;
        info!(project, stages = graph.len(), "scheduling session opened");

        Ok(Self {
            project: project.to_string(),
            graph,
            engine: ScheduleEngine::new(policy),
            store,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn engine(&self) -> &ScheduleEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn critical_path(&self) -> CriticalPath {
        CriticalPath::compute(&self.graph)
    }

    /// Evaluate a tentative move without changing anything.
    pub fn propose(&self, stage_id: &str, start: NaiveDate, end: NaiveDate) -> Result<MovePreview> {
        let report = self.engine.propose_move(&self.graph, stage_id, start, end)?;
        let suggestion = suggest(&report, self.engine.policy());
        Ok(MovePreview { report, suggestion })
    }

    /// Re-propose the moved stage using the preview's suggested window.
    ///
    /// Returns `None` when the suggestion does not change the proposal.
    pub fn propose_suggestion(&self, preview: &MovePreview) -> Result<Option<MovePreview>> {
        let Some(window) = preview
            .suggestion
            .as_ref()
            .and_then(|s| s.proposed_window(&preview.report))
        else {
            return Ok(None);
        };

        debug!(stage = %preview.report.stage_id, to = %window, "re-proposing with suggestion");
        self.propose(&preview.report.stage_id, window.start, window.end)
            .map(Some)
    }

    /// Commit a report and persist every touched stage.
    ///
    /// The new dates are adopted only after the store accepted them; on any
    /// failure the session keeps its previous graph.
    pub async fn commit(&mut self, report: &ImpactReport) -> Result<Vec<Stage>> {
        let mut next = self.graph.clone();
        let applied = self.engine.commit(&mut next, report)?;

        let updates: Vec<StageUpdate> = applied.iter().map(StageUpdate::from).collect();
        self.store.update_stages(&self.project, updates).await?;

        self.graph = next;
        info!(project = %self.project, stages = applied.len(), "session commit persisted");
        Ok(applied)
    }

    /// Mark a stage completed (or any other status) in the session graph.
    ///
    /// Status changes are not persisted by the session; they usually come
    /// from elsewhere and invalidate in-flight proposals for that stage.
    pub fn set_status(&mut self, stage_id: &str, status: crate::types::StageStatus) -> Result<()> {
        self.graph.set_status(stage_id, status)
    }

    /// Reload the project from the store, dropping local state.
    pub async fn refresh(&mut self) -> Result<()> {
        let stages = self.store.load_stages(&self.project).await?;
        self.graph = StageGraph::build(stages)?;
        debug!(project = %self.project, "session refreshed");
        Ok(())
    }

    /// Look up a stage, failing with `StageNotFound`.
    pub fn stage(&self, stage_id: &str) -> Result<&Stage> {
        self.graph
            .stage(stage_id)
            .ok_or_else(|| PrincessError::StageNotFound(stage_id.to_string()))
    }
}
