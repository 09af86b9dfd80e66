// src/dag/stage.rs

//! Stage records and date windows.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::errors::{PrincessError, Result};
use crate::types::{StageCategory, StageStatus};

/// Canonical stage identifier type used throughout the crate.
pub type StageId = String;

/// Inclusive calendar window `[start, end]` of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Build a window, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(PrincessError::InvalidMove(format!(
                "end date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Length of the window in whole calendar days.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Same duration, moved by `days` (negative moves earlier).
    ///
    /// Fails with `InvalidMove` when the result leaves chrono's date range.
    pub fn shifted(&self, days: i64) -> Result<Self> {
        let out_of_range =
            || PrincessError::InvalidMove(format!("shifting {self} by {days} day(s) leaves the calendar"));
        let delta = TimeDelta::try_days(days).ok_or_else(out_of_range)?;

        Ok(Self {
            start: self.start.checked_add_signed(delta).ok_or_else(out_of_range)?,
            end: self.end.checked_add_signed(delta).ok_or_else(out_of_range)?,
        })
    }

    /// Window with the same duration starting at `start`.
    pub fn starting_at(&self, start: NaiveDate) -> Result<Self> {
        self.shifted((start - self.start).num_days())
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// A unit of playbook work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    /// Position in the canonical playbook (1..N). Not the schedule order.
    pub number_index: u32,
    pub name: String,
    pub category: StageCategory,
    #[serde(default)]
    pub status: StageStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Stages that must complete before this one may start.
    #[serde(default)]
    pub dependencies: BTreeSet<StageId>,
    #[serde(default)]
    pub is_deliverable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl Stage {
    pub fn new(
        id: impl Into<StageId>,
        number_index: u32,
        name: impl Into<String>,
        category: StageCategory,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            number_index,
            name: name.into(),
            category,
            status: StageStatus::NotReady,
            start_date,
            end_date,
            dependencies: BTreeSet::new(),
            is_deliverable: false,
            assigned_to: None,
        }
    }

    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn duration_days(&self) -> i64 {
        self.window().duration_days()
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub(crate) fn set_window(&mut self, window: DateWindow) {
        self.start_date = window.start;
        self.end_date = window.end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn window_rejects_inverted_dates() {
        let err = DateWindow::new(d(2026, 3, 5), d(2026, 3, 2)).unwrap_err();
        assert!(matches!(err, PrincessError::InvalidMove(_)));
    }

    #[test]
    fn shifting_preserves_duration_across_month_boundary() {
        let w = DateWindow::new(d(2026, 1, 29), d(2026, 2, 2)).unwrap();
        let moved = w.shifted(5).unwrap();
        assert_eq!(moved.start, d(2026, 2, 3));
        assert_eq!(moved.end, d(2026, 2, 7));
        assert_eq!(moved.duration_days(), w.duration_days());
        assert_eq!(moved.shifted(-5).unwrap(), w);
    }

    #[test]
    fn starting_at_keeps_length() {
        let w = DateWindow::new(d(2026, 3, 2), d(2026, 3, 4)).unwrap();
        let moved = w.starting_at(d(2026, 3, 10)).unwrap();
        assert_eq!(moved, DateWindow::new(d(2026, 3, 10), d(2026, 3, 12)).unwrap());
    }

    #[test]
    fn shifting_past_the_calendar_is_an_invalid_move() {
        let w = DateWindow::new(NaiveDate::MAX, NaiveDate::MAX).unwrap();
        assert!(matches!(w.shifted(1), Err(PrincessError::InvalidMove(_))));

        let w = DateWindow::new(d(2026, 3, 2), d(2026, 3, 4)).unwrap();
        assert!(matches!(w.shifted(i64::MAX), Err(PrincessError::InvalidMove(_))));
        assert!(matches!(w.shifted(-(1 << 40)), Err(PrincessError::InvalidMove(_))));
    }
}
