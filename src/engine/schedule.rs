// src/engine/schedule.rs

//! Pure schedule engine: proposals, cascades and commits.
//!
//! The engine never owns a graph. Callers pass a `&StageGraph` snapshot to
//! [`ScheduleEngine::propose_move`] (any number of proposals may run against
//! the same snapshot) and a `&mut StageGraph` to [`ScheduleEngine::commit`].

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::SchedulePolicy;
use crate::dag::{CriticalPath, DateWindow, Stage, StageGraph};
use crate::engine::severity::classify_cascade;
use crate::engine::{
    AffectedStage, Conflict, ConflictKind, ImpactReport, OrderingViolation, ProposalOutcome,
    StageSnapshot,
};
use crate::errors::{PrincessError, Result};
use crate::types::Severity;

#[derive(Debug, Clone, Default)]
pub struct ScheduleEngine {
    policy: SchedulePolicy,
}

impl ScheduleEngine {
    pub fn new(policy: SchedulePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    /// Compute the impact of moving `stage_id` to `[new_start, new_end]`.
    ///
    /// Fails only for malformed input (`InvalidMove`). Everything else,
    /// including moves that can never be committed, comes back as data in
    /// the report.
    pub fn propose_move(
        &self,
        graph: &StageGraph,
        stage_id: &str,
        new_start: NaiveDate,
        new_end: NaiveDate,
    ) -> Result<ImpactReport> {
        let stage = graph
            .stage(stage_id)
            .ok_or_else(|| PrincessError::InvalidMove(format!("unknown stage '{stage_id}'")))?;
        let proposed = DateWindow::new(new_start, new_end)?;
        let original = stage.window();

        debug!(stage = %stage_id, from = %original, to = %proposed, "proposing move");

        if stage.is_completed() && proposed != original {
            warn!(stage = %stage_id, "move of a completed stage rejected");
            let conflict = Conflict {
                kind: ConflictKind::DependencyViolation,
                severity: Severity::Critical,
                stage_id: stage.id.clone(),
                message: format!("'{}' is completed; its dates are frozen", stage.name),
                resolution_days: Some((original.start - proposed.start).num_days()),
            };
            return Ok(self.finish(graph, stage, proposed, Vec::new(), vec![conflict]));
        }

        let mut conflicts = Vec::new();

        if let Some(latest) = graph.latest_dependency_end(stage_id) {
            if proposed.start < latest {
                let gap = (latest - proposed.start).num_days();
                conflicts.push(Conflict {
                    kind: ConflictKind::DependencyViolation,
                    severity: Severity::Critical,
                    stage_id: stage.id.clone(),
                    message: format!(
                        "'{}' would start {gap} day(s) before its dependencies finish on {latest}",
                        stage.name
                    ),
                    resolution_days: Some(gap),
                });
            }
        }

        let critical = CriticalPath::compute(graph);
        let (affected, mut cascade_conflicts) = self.cascade(graph, stage, proposed, &critical)?;
        conflicts.append(&mut cascade_conflicts);

        if !affected.is_empty() {
            let max_delay = affected.iter().map(|a| a.adjustment_days).max().unwrap_or(0);
            let severity = classify_cascade(&self.policy, &affected);
            conflicts.push(Conflict {
                kind: ConflictKind::Cascade,
                severity,
                stage_id: stage.id.clone(),
                message: format!(
                    "moving '{}' delays {} dependent stage(s) by up to {max_delay} day(s)",
                    stage.name,
                    affected.len()
                ),
                resolution_days: None,
            });
        }

        Ok(self.finish(graph, stage, proposed, affected, conflicts))
    }

    /// Push every transitive dependent of `moved` far enough to start after
    /// all of its dependencies end under the tentative dates.
    ///
    /// Dependents are processed in topological order (Kahn's algorithm
    /// restricted to the descendants), so each stage is finalized once all
    /// of its own dependencies have been.
    fn cascade(
        &self,
        graph: &StageGraph,
        moved: &Stage,
        proposed: DateWindow,
        critical: &CriticalPath,
    ) -> Result<(Vec<AffectedStage>, Vec<Conflict>)> {
        let mut affected = Vec::new();
        let mut conflicts = Vec::new();

        let descendants = graph.descendants_of(&moved.id);
        if descendants.is_empty() {
            return Ok((affected, conflicts));
        }
        let in_scope: HashSet<&str> = descendants.iter().copied().collect();

        let mut tentative: HashMap<&str, DateWindow> = HashMap::new();
        tentative.insert(moved.id.as_str(), proposed);

        let mut pending: HashMap<&str, usize> = descendants
            .iter()
            .map(|&id| {
                let unresolved = graph
                    .dependency_ids(id)
                    .iter()
                    .filter(|dep| in_scope.contains(dep.as_str()))
                    .count();
                (id, unresolved)
            })
            .collect();

        let mut ready: Vec<&str> = pending
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&id, _)| id)
            .collect();
        ready.sort_by_key(|id| graph.stage(id).map(|s| s.number_index).unwrap_or(u32::MAX));
        let mut queue: VecDeque<&str> = ready.into();

        while let Some(id) = queue.pop_front() {
            let Some(stage) = graph.stage(id) else {
                continue;
            };
            let current = stage.window();

            let latest_dep_end = graph
                .dependency_ids(id)
                .iter()
                .filter_map(|dep| {
                    tentative
                        .get(dep.as_str())
                        .copied()
                        .or_else(|| graph.stage(dep).map(Stage::window))
                })
                .map(|w| w.end)
                .max();
            let required = latest_dep_end.map_or(current.start, |end| end.max(current.start));
            let delta = (required - current.start).num_days();

            if delta > 0 {
                if stage.is_completed() {
                    warn!(stage = %id, delta, "cascade reaches a completed stage");
                    conflicts.push(Conflict {
                        kind: ConflictKind::DependencyViolation,
                        severity: Severity::Critical,
                        stage_id: stage.id.clone(),
                        message: format!(
                            "completed stage '{}' would have to move {delta} day(s) later",
                            stage.name
                        ),
                        resolution_days: Some(-delta),
                    });
                } else {
                    let new_window = current.shifted(delta)?;
                    debug!(stage = %id, delta, to = %new_window, "cascade shifts dependent");
                    tentative.insert(id, new_window);
                    affected.push(AffectedStage {
                        stage_id: stage.id.clone(),
                        stage_name: stage.name.clone(),
                        number_index: stage.number_index,
                        adjustment_days: delta,
                        original_window: current,
                        new_window,
                        on_critical_path: critical.contains(id),
                    });
                }
            }

            for dependent in graph.dependent_ids(id) {
                if let Some(n) = pending.get_mut(dependent.as_str()) {
                    *n = n.saturating_sub(1);
                    if *n == 0 {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }

        Ok((affected, conflicts))
    }

    /// Sort, classify and snapshot into the final report.
    fn finish(
        &self,
        graph: &StageGraph,
        moved: &Stage,
        proposed: DateWindow,
        mut affected: Vec<AffectedStage>,
        mut conflicts: Vec<Conflict>,
    ) -> ImpactReport {
        affected.sort_by(|a, b| {
            b.adjustment_days
                .abs()
                .cmp(&a.adjustment_days.abs())
                .then(a.number_index.cmp(&b.number_index))
        });

        let index_of = |id: &str| graph.stage(id).map(|s| s.number_index).unwrap_or(u32::MAX);
        conflicts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.kind.cmp(&b.kind))
                .then_with(|| index_of(a.stage_id.as_str()).cmp(&index_of(b.stage_id.as_str())))
        });

        let outcome = if conflicts.iter().any(Conflict::is_violation) {
            ProposalOutcome::Rejected
        } else if conflicts.is_empty() && affected.is_empty() {
            ProposalOutcome::Clean
        } else {
            ProposalOutcome::HasWarnings
        };

        // Everything the cascade read: the moved stage, what it waits on,
        // and every stage downstream, moved or not.
        let watched = std::iter::once(moved)
            .chain(graph.dependencies_of(&moved.id))
            .chain(graph.descendants_of(&moved.id).into_iter().filter_map(|id| graph.stage(id)));
        let snapshot: BTreeMap<_, _> = watched
            .map(|stage| {
                (
                    stage.id.clone(),
                    StageSnapshot {
                        window: stage.window(),
                        status: stage.status,
                    },
                )
            })
            .collect();

        debug!(
            stage = %moved.id,
            affected = affected.len(),
            conflicts = conflicts.len(),
            ?outcome,
            "proposal evaluated"
        );

        ImpactReport {
            stage_id: moved.id.clone(),
            stage_name: moved.name.clone(),
            original_window: moved.window(),
            proposed_window: proposed,
            affected,
            conflicts,
            outcome,
            snapshot,
        }
    }

    /// Apply an accepted report to `graph`.
    ///
    /// Returns the applied stages: the moved stage first, then the affected
    /// stages in report order. Nothing is written unless every check passes.
    pub fn commit(&self, graph: &mut StageGraph, report: &ImpactReport) -> Result<Vec<Stage>> {
        if !report.is_applicable() {
            let reason = report
                .conflicts
                .iter()
                .find(|c| c.is_violation())
                .map(|c| c.message.clone())
                .unwrap_or_else(|| "proposal was rejected".to_string());
            warn!(stage = %report.stage_id, %reason, "refusing to commit rejected proposal");
            return Err(PrincessError::DependencyViolation(reason));
        }

        for (id, snap) in &report.snapshot {
            let stage = graph.stage(id).ok_or_else(|| {
                PrincessError::StaleGraph(format!("stage '{id}' no longer exists"))
            })?;

            if stage.is_completed() && !snap.status.is_completed() {
                warn!(stage = %id, "stage completed after the proposal was made");
                return Err(PrincessError::StaleGraph(format!(
                    "stage '{id}' was completed after the proposal was made"
                )));
            }

            if stage.window() != snap.window || stage.status != snap.status {
                warn!(stage = %id, was = %snap.window, now = %stage.window(), "stale proposal");
                return Err(PrincessError::StaleGraph(format!(
                    "stage '{id}' changed since the proposal ({} -> {})",
                    snap.window,
                    stage.window()
                )));
            }
        }

        if let Some(a) = report
            .affected
            .iter()
            .find(|a| !graph.is_descendant(&report.stage_id, &a.stage_id))
        {
            return Err(PrincessError::StaleGraph(format!(
                "stage '{}' no longer depends on '{}'",
                a.stage_id, report.stage_id
            )));
        }

        // Dependencies may have been rewired since the proposal; the cascade
        // must come out the same against the current graph.
        let fresh = self.propose_move(
            graph,
            &report.stage_id,
            report.proposed_window.start,
            report.proposed_window.end,
        )?;
        if !fresh.is_applicable() || planned_writes(&fresh) != planned_writes(report) {
            warn!(stage = %report.stage_id, "cascade differs from the proposal");
            return Err(PrincessError::StaleGraph(format!(
                "moving '{}' now needs a different cascade; propose it again",
                report.stage_id
            )));
        }

        let writes = planned_writes(report);

        for (id, window) in &writes {
            graph.set_window(id, *window)?;
        }

        let applied: Vec<Stage> = writes
            .iter()
            .filter_map(|(id, _)| graph.stage(id).cloned())
            .collect();

        info!(
            stage = %report.stage_id,
            to = %report.proposed_window,
            affected = report.affected.len(),
            "move committed"
        );

        Ok(applied)
    }

    /// List every stage that starts before one of its dependencies ends.
    pub fn audit_ordering(&self, graph: &StageGraph) -> Vec<OrderingViolation> {
        let mut violations = Vec::new();

        for stage in graph.stages() {
            for dep in graph.dependencies_of(&stage.id) {
                if stage.start_date < dep.end_date {
                    violations.push(OrderingViolation {
                        stage_id: stage.id.clone(),
                        dependency_id: dep.id.clone(),
                        gap_days: (dep.end_date - stage.start_date).num_days(),
                    });
                }
            }
        }

        if !violations.is_empty() {
            debug!(count = violations.len(), "ordering violations found");
        }
        violations
    }
}

/// Every `(stage, window)` a commit of `report` writes, moved stage first.
fn planned_writes(report: &ImpactReport) -> Vec<(&str, DateWindow)> {
    std::iter::once((report.stage_id.as_str(), report.proposed_window))
        .chain(report.affected.iter().map(|a| (a.stage_id.as_str(), a.new_window)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StageCategory, StageStatus};

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date") + chrono::Duration::days(n)
    }

    fn stage(id: &str, idx: u32, start: i64, end: i64, deps: &[&str]) -> Stage {
        let mut s = Stage::new(id, idx, id.to_uppercase(), StageCategory::BrandBuilding, day(start), day(end));
        s.dependencies = deps.iter().map(|d| d.to_string()).collect();
        s
    }

    #[test]
    fn unknown_stage_and_inverted_window_are_invalid() {
        let g = StageGraph::build(vec![stage("a", 1, 0, 2, &[])]).unwrap();
        let engine = ScheduleEngine::default();

        assert!(matches!(
            engine.propose_move(&g, "nope", day(0), day(1)),
            Err(PrincessError::InvalidMove(_))
        ));
        assert!(matches!(
            engine.propose_move(&g, "a", day(3), day(1)),
            Err(PrincessError::InvalidMove(_))
        ));
    }

    #[test]
    fn diamond_join_waits_for_latest_branch() {
        // a -> b -> d, a -> c -> d; c is longer than b.
        let g = StageGraph::build(vec![
            stage("a", 1, 0, 2, &[]),
            stage("b", 2, 2, 3, &["a"]),
            stage("c", 3, 2, 6, &["a"]),
            stage("d", 4, 6, 8, &["b", "c"]),
        ])
        .unwrap();
        let engine = ScheduleEngine::default();

        let report = engine.propose_move(&g, "a", day(3), day(5)).unwrap();
        assert_eq!(report.affected_stage("b").unwrap().adjustment_days, 3);
        assert_eq!(report.affected_stage("c").unwrap().adjustment_days, 3);
        // d must follow c's new end (day 9), not b's (day 6).
        let d = report.affected_stage("d").unwrap();
        assert_eq!(d.adjustment_days, 3);
        assert_eq!(d.new_window.start, day(9));
    }

    #[test]
    fn slack_absorbs_small_moves() {
        let g = StageGraph::build(vec![
            stage("a", 1, 0, 2, &[]),
            stage("b", 2, 5, 7, &["a"]),
        ])
        .unwrap();
        let engine = ScheduleEngine::default();

        let report = engine.propose_move(&g, "a", day(1), day(3)).unwrap();
        assert!(report.affected.is_empty());
        assert_eq!(report.outcome, ProposalOutcome::Clean);

        let report = engine.propose_move(&g, "a", day(3), day(7)).unwrap();
        assert_eq!(report.affected_stage("b").unwrap().adjustment_days, 2);
    }

    #[test]
    fn starting_before_dependencies_is_a_violation() {
        let g = StageGraph::build(vec![
            stage("a", 1, 0, 4, &[]),
            stage("b", 2, 4, 6, &["a"]),
        ])
        .unwrap();
        let engine = ScheduleEngine::default();

        let report = engine.propose_move(&g, "b", day(1), day(3)).unwrap();
        assert_eq!(report.outcome, ProposalOutcome::Rejected);
        assert_eq!(report.conflicts[0].kind, ConflictKind::DependencyViolation);
        assert_eq!(report.conflicts[0].resolution_days, Some(3));
    }

    #[test]
    fn completed_stage_may_be_proposed_unchanged() {
        let mut a = stage("a", 1, 0, 2, &[]);
        a.status = StageStatus::Completed;
        let g = StageGraph::build(vec![a]).unwrap();
        let engine = ScheduleEngine::default();

        let report = engine.propose_move(&g, "a", day(0), day(2)).unwrap();
        assert_eq!(report.outcome, ProposalOutcome::Clean);
    }

    #[test]
    fn audit_reports_each_violating_edge() {
        let g = StageGraph::build(vec![
            stage("a", 1, 0, 4, &[]),
            stage("b", 2, 2, 6, &["a"]),
            stage("c", 3, 6, 7, &["b"]),
        ])
        .unwrap();
        let violations = ScheduleEngine::default().audit_ordering(&g);
        assert_eq!(
            violations,
            vec![OrderingViolation {
                stage_id: "b".to_string(),
                dependency_id: "a".to_string(),
                gap_days: 2,
            }]
        );
    }

    #[test]
    fn moving_a_slack_dependent_makes_older_proposals_stale() {
        let mut g = StageGraph::build(vec![
            stage("a", 1, 0, 2, &[]),
            stage("b", 2, 5, 7, &["a"]),
        ])
        .unwrap();
        let engine = ScheduleEngine::default();

        // b's slack absorbs this move, so nothing cascades.
        let first = engine.propose_move(&g, "a", day(1), day(4)).unwrap();
        assert!(first.affected.is_empty());
        assert!(first.snapshot.contains_key("b"));

        let second = engine.propose_move(&g, "b", day(2), day(4)).unwrap();
        engine.commit(&mut g, &second).unwrap();

        assert!(matches!(
            engine.commit(&mut g, &first),
            Err(PrincessError::StaleGraph(_))
        ));
        assert!(engine.audit_ordering(&g).is_empty());
        assert_eq!(g.stage("a").unwrap().start_date, day(0));
    }

    #[test]
    fn moving_a_dependency_makes_older_proposals_stale() {
        let mut g = StageGraph::build(vec![
            stage("a", 1, 0, 2, &[]),
            stage("b", 2, 2, 4, &["a"]),
        ])
        .unwrap();
        let engine = ScheduleEngine::default();

        let first = engine.propose_move(&g, "b", day(3), day(5)).unwrap();
        assert!(first.is_applicable());

        let second = engine.propose_move(&g, "a", day(0), day(4)).unwrap();
        assert!(second.is_applicable());
        engine.commit(&mut g, &second).unwrap();

        assert!(matches!(
            engine.commit(&mut g, &first),
            Err(PrincessError::StaleGraph(_))
        ));
        assert!(engine.audit_ordering(&g).is_empty());
    }

    #[test]
    fn cascade_past_the_calendar_is_an_invalid_move() {
        let last = NaiveDate::MAX;
        let g = StageGraph::build(vec![
            Stage::new("a", 1, "A", StageCategory::Research, day(0), day(2)),
            {
                let mut b = Stage::new("b", 2, "B", StageCategory::Research, day(2), last);
                b.dependencies.insert("a".to_string());
                b
            },
        ])
        .unwrap();

        let err = ScheduleEngine::default()
            .propose_move(&g, "a", day(0), day(3))
            .unwrap_err();
        assert!(matches!(err, PrincessError::InvalidMove(_)));
    }
}
