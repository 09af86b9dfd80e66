// src/engine/mod.rs

//! Dependency-aware rescheduling.
//!
//! This module ties together:
//! - the pure schedule engine that turns a proposed move into an
//!   [`ImpactReport`] and commits accepted reports ([`schedule`])
//! - cascade severity classification ([`severity`])
//! - the one-click suggestion generator ([`suggest`])
//! - the async session shell that loads stages from a store and writes
//!   committed dates back ([`session`])
//!
//! Everything except `session` is synchronous and free of IO.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dag::stage::{DateWindow, StageId};
use crate::types::{Severity, StageStatus};

/// Kind of conflict raised by a proposed move.
///
/// Declared in precedence order: conflicts of the same severity sort
/// violations before cascades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The move requires moving a completed stage, or starts a stage before
    /// its dependencies end. Always critical; the move cannot be committed.
    DependencyViolation,
    /// The move pushes dependent stages later. Informational.
    Cascade,
}

/// A single conflict attached to an [`ImpactReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    /// Stage the conflict is about.
    pub stage_id: StageId,
    pub message: String,
    /// Days to shift the proposal to make this conflict go away
    /// (positive = later). Only set for dependency violations.
    pub resolution_days: Option<i64>,
}

impl Conflict {
    pub fn is_violation(&self) -> bool {
        self.kind == ConflictKind::DependencyViolation
    }
}

/// A dependent stage that the cascade moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedStage {
    pub stage_id: StageId,
    pub stage_name: String,
    pub number_index: u32,
    /// Days the stage moves (always positive: cascades only push later).
    pub adjustment_days: i64,
    pub original_window: DateWindow,
    pub new_window: DateWindow,
    pub on_critical_path: bool,
}

/// Where a proposal ended up.
///
/// `Clean` and `HasWarnings` may be committed; `Rejected` is terminal and
/// the caller must propose different dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOutcome {
    Clean,
    HasWarnings,
    Rejected,
}

/// Dates and status of a stage the proposal depended on, as seen at
/// proposal time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageSnapshot {
    pub window: DateWindow,
    pub status: StageStatus,
}

/// Result of a proposed move. Transient: regenerated on every proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    pub stage_id: StageId,
    pub stage_name: String,
    pub original_window: DateWindow,
    pub proposed_window: DateWindow,
    /// Largest adjustment first.
    pub affected: Vec<AffectedStage>,
    /// Most severe first.
    pub conflicts: Vec<Conflict>,
    pub outcome: ProposalOutcome,
    /// State of the moved stage, its direct dependencies and every stage
    /// downstream of it. Commit refuses the report if any of them changed.
    pub snapshot: BTreeMap<StageId, StageSnapshot>,
}

impl ImpactReport {
    /// Whether the report may be committed.
    pub fn is_applicable(&self) -> bool {
        self.outcome != ProposalOutcome::Rejected
    }

    pub fn has_dependency_violation(&self) -> bool {
        self.conflicts.iter().any(Conflict::is_violation)
    }

    /// Largest single adjustment, or 0 when nothing cascades.
    pub fn max_adjustment_days(&self) -> i64 {
        self.affected
            .iter()
            .map(|a| a.adjustment_days.abs())
            .max()
            .unwrap_or(0)
    }

    /// Sum of all adjustments: the total delay the cascade introduces.
    pub fn total_adjustment_days(&self) -> i64 {
        self.affected.iter().map(|a| a.adjustment_days.abs()).sum()
    }

    /// Days the moved stage itself shifts (start to start).
    pub fn shift_days(&self) -> i64 {
        (self.proposed_window.start - self.original_window.start).num_days()
    }

    /// Whether the proposal changes the dates of a stage that was already
    /// completed when it was made.
    pub fn moves_frozen_stage(&self) -> bool {
        self.proposed_window != self.original_window
            && self
                .snapshot
                .get(&self.stage_id)
                .is_some_and(|s| s.status.is_completed())
    }

    pub fn affected_stage(&self, id: &str) -> Option<&AffectedStage> {
        self.affected.iter().find(|a| a.stage_id == id)
    }
}

/// A stage whose start precedes the end of one of its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderingViolation {
    pub stage_id: StageId,
    pub dependency_id: StageId,
    /// How many days the stage would have to move later.
    pub gap_days: i64,
}

pub mod schedule;
pub mod session;
pub mod severity;
pub mod suggest;

pub use schedule::ScheduleEngine;
pub use session::{MovePreview, SchedulingSession};
pub use suggest::{suggest, Suggestion, SuggestionKind};
pub use crate::config::SchedulePolicy;
