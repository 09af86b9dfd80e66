// src/engine/suggest.rs

//! One-click suggestions derived from an impact report.

use std::fmt;

use serde::Serialize;

use crate::config::SchedulePolicy;
use crate::dag::DateWindow;
use crate::engine::{Conflict, ImpactReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Move the proposal by `days` so dependency ordering holds.
    RespectDependencies,
    /// The moved stage is completed: put it back on its original dates.
    RestoreDates,
    /// Too many stages move: tighten the downstream timeline.
    CompressTimeline,
    /// A long delay: move the proposal part of the way back.
    ShiftPhase,
    /// Nothing alarming; go ahead.
    ApplyChange,
}

/// A single actionable recommendation for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    /// Size of the action in days; its meaning depends on `kind`.
    pub days: i64,
    pub message: String,
}

impl Suggestion {
    /// Window a one-click apply would re-propose for the moved stage.
    ///
    /// `CompressTimeline` and `ApplyChange` do not change the proposal.
    pub fn proposed_window(&self, report: &ImpactReport) -> Option<DateWindow> {
        match self.kind {
            SuggestionKind::RespectDependencies => report.proposed_window.shifted(self.days).ok(),
            SuggestionKind::RestoreDates => Some(report.original_window),
            SuggestionKind::ShiftPhase => report.proposed_window.shifted(-self.days).ok(),
            SuggestionKind::CompressTimeline | SuggestionKind::ApplyChange => None,
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Turn a report into at most one suggestion.
///
/// Rules are checked in order; the first match wins:
/// 1. a dependency violation: restore a frozen stage's dates, or shift by
///    the violation's resolution;
/// 2. more than `compress_min_affected` stages move: compress;
/// 3. a delay longer than `shift_min_delay_days`: shift by half of it;
/// 4. nothing moves and nothing conflicts: no suggestion;
/// 5. otherwise: apply as proposed.
pub fn suggest(report: &ImpactReport, policy: &SchedulePolicy) -> Option<Suggestion> {
    if report.moves_frozen_stage() {
        return Some(Suggestion {
            kind: SuggestionKind::RestoreDates,
            days: (report.original_window.start - report.proposed_window.start).num_days(),
            message: format!(
                "Keep '{}' on {}; it is completed",
                report.stage_name, report.original_window
            ),
        });
    }

    if let Some(violation) = report.conflicts.iter().find(|c| Conflict::is_violation(c)) {
        return Some(respect_dependencies(report, violation));
    }

    let max_delay = report.max_adjustment_days();

    if report.affected.len() > policy.compress_min_affected {
        return Some(Suggestion {
            kind: SuggestionKind::CompressTimeline,
            days: max_delay,
            message: format!(
                "Compress the timeline by {max_delay} day(s) to absorb the delay across {} stages",
                report.affected.len()
            ),
        });
    }

    if max_delay > policy.shift_min_delay_days {
        let days = (max_delay + 1) / 2;
        return Some(Suggestion {
            kind: SuggestionKind::ShiftPhase,
            days,
            message: format!(
                "Shift '{}' {days} day(s) earlier to halve the {max_delay}-day delay",
                report.stage_name
            ),
        });
    }

    if report.conflicts.is_empty() && report.affected.is_empty() {
        return None;
    }

    Some(Suggestion {
        kind: SuggestionKind::ApplyChange,
        days: 0,
        message: format!(
            "Apply the change; {} dependent stage(s) shift by up to {max_delay} day(s)",
            report.affected.len()
        ),
    })
}

fn respect_dependencies(report: &ImpactReport, violation: &Conflict) -> Suggestion {
    let days = violation.resolution_days.unwrap_or(0);
    let message = match days {
        d if d > 0 => format!(
            "Move '{}' {d} day(s) later to respect dependencies",
            report.stage_name
        ),
        d if d < 0 => format!(
            "Move '{}' {} day(s) earlier so completed stages keep their dates",
            report.stage_name,
            -d
        ),
        _ => format!("Keep '{}' on its original dates", report.stage_name),
    };

    Suggestion {
        kind: SuggestionKind::RespectDependencies,
        days,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{Stage, StageGraph};
    use crate::engine::ScheduleEngine;
    use crate::types::StageCategory;
    use chrono::NaiveDate;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date") + chrono::Duration::days(n)
    }

    fn chain() -> StageGraph {
        let mut b = Stage::new("b", 2, "Brief", StageCategory::Strategy, day(2), day(4));
        b.dependencies.insert("a".to_string());
        StageGraph::build(vec![
            Stage::new("a", 1, "Audit", StageCategory::Research, day(0), day(2)),
            b,
        ])
        .unwrap()
    }

    #[test]
    fn long_delay_suggests_half_shift_that_can_be_applied() {
        let g = chain();
        let engine = ScheduleEngine::default();
        let report = engine.propose_move(&g, "a", day(9), day(11)).unwrap();
        assert_eq!(report.max_adjustment_days(), 9);

        let s = suggest(&report, engine.policy()).unwrap();
        assert_eq!(s.kind, SuggestionKind::ShiftPhase);
        assert_eq!(s.days, 5);

        let window = s.proposed_window(&report).unwrap();
        assert_eq!(window.start, day(4));
        let follow_up = engine.propose_move(&g, "a", window.start, window.end).unwrap();
        assert_eq!(follow_up.max_adjustment_days(), 4);
    }

    #[test]
    fn small_cascade_suggests_applying() {
        let g = chain();
        let engine = ScheduleEngine::default();
        let report = engine.propose_move(&g, "a", day(1), day(3)).unwrap();
        let s = suggest(&report, engine.policy()).unwrap();
        assert_eq!(s.kind, SuggestionKind::ApplyChange);
        assert!(s.proposed_window(&report).is_none());
    }

    #[test]
    fn ordering_violation_suggests_moving_later() {
        let g = chain();
        let engine = ScheduleEngine::default();
        let report = engine.propose_move(&g, "b", day(1), day(3)).unwrap();
        let s = suggest(&report, engine.policy()).unwrap();
        assert_eq!(s.kind, SuggestionKind::RespectDependencies);
        assert_eq!(s.days, 1);
        assert!(s.message.contains("1 day(s) later"));

        let fixed = s.proposed_window(&report).unwrap();
        let retry = engine.propose_move(&g, "b", fixed.start, fixed.end).unwrap();
        assert!(retry.is_applicable());
        assert!(suggest(&retry, engine.policy()).is_none());
    }

    #[test]
    fn resized_completed_stage_is_restored_to_its_dates() {
        let mut a = Stage::new("a", 1, "Audit", StageCategory::Research, day(0), day(2));
        a.status = crate::types::StageStatus::Completed;
        let g = StageGraph::build(vec![a]).unwrap();
        let engine = ScheduleEngine::default();

        // Later and longer.
        let report = engine.propose_move(&g, "a", day(1), day(5)).unwrap();
        assert!(!report.is_applicable());

        let s = suggest(&report, engine.policy()).unwrap();
        assert_eq!(s.kind, SuggestionKind::RestoreDates);
        assert_eq!(s.days, -1);

        let window = s.proposed_window(&report).unwrap();
        assert_eq!(window, report.original_window);
        let retry = engine.propose_move(&g, "a", window.start, window.end).unwrap();
        assert!(retry.is_applicable());
    }
}
