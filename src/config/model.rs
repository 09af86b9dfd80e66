// src/config/model.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dag::stage::{Stage, StageId};
use crate::types::{StageCategory, StageStatus};

/// Top-level project file as read from TOML, before validation.
///
/// ```toml
/// [project]
/// name = "acme-rebrand"
///
/// [policy]
/// low_max_affected = 2
/// low_max_total_delay_days = 2
/// escalate_on_critical_path = true
///
/// [stage.kickoff]
/// number_index = 1
/// name = "Kickoff"
/// category = "onboarding"
/// status = "completed"
/// start = "2026-03-02"
/// end = "2026-03-05"
///
/// [stage.research]
/// number_index = 2
/// name = "Market research"
/// category = "research"
/// start = "2026-03-05"
/// end = "2026-03-12"
/// after = ["kickoff"]
/// ```
///
/// Dates are quoted ISO strings. All sections except `[stage.*]` are
/// optional.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawProjectFile {
    #[serde(default)]
    pub project: ProjectSection,

    /// Severity and suggestion thresholds from `[policy]`.
    #[serde(default)]
    pub policy: SchedulePolicy,

    /// All stages from `[stage.<id>]`, keyed by stage id.
    #[serde(default)]
    pub stage: BTreeMap<StageId, StageConfig>,
}

/// Validated project file.
///
/// Construct via `ProjectFile::try_from(raw)`; see `config::validate`.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub project: ProjectSection,
    pub policy: SchedulePolicy,
    pub stage: BTreeMap<StageId, StageConfig>,
}

impl ProjectFile {
    pub(crate) fn new_unchecked(
        project: ProjectSection,
        policy: SchedulePolicy,
        stage: BTreeMap<StageId, StageConfig>,
    ) -> Self {
        Self {
            project,
            policy,
            stage,
        }
    }

    /// Stage records, in playbook order.
    pub fn to_stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self
            .stage
            .iter()
            .map(|(id, cfg)| cfg.to_stage(id))
            .collect();
        stages.sort_by_key(|s| s.number_index);
        stages
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectSection {
    /// Project key used when talking to a stage store.
    ///
    /// If `None`, callers fall back to the file stem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `[policy]` section: thresholds for cascade severity and suggestions.
///
/// Defaults mirror the dashboard's hard-coded constants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchedulePolicy {
    /// Cascades touching at most this many stages are `low`.
    #[serde(default = "default_low_max_affected")]
    pub low_max_affected: usize,

    /// ... at most this many are `medium`.
    #[serde(default = "default_medium_max_affected")]
    pub medium_max_affected: usize,

    /// ... at most this many are `high`; anything larger is `critical`.
    #[serde(default = "default_high_max_affected")]
    pub high_max_affected: usize,

    /// Cascades delaying stages by at most this many days in total are `low`.
    #[serde(default = "default_low_max_total_delay_days")]
    pub low_max_total_delay_days: i64,

    /// ... at most this many days are `medium`; anything longer is `high`.
    #[serde(default = "default_medium_max_total_delay_days")]
    pub medium_max_total_delay_days: i64,

    /// Escalate one tier when the cascade touches the critical path.
    #[serde(default = "default_true")]
    pub escalate_on_critical_path: bool,

    /// Suggest compressing the timeline when more stages than this move.
    #[serde(default = "default_compress_min_affected")]
    pub compress_min_affected: usize,

    /// Suggest shifting the phase when the largest delay exceeds this.
    #[serde(default = "default_shift_min_delay_days")]
    pub shift_min_delay_days: i64,
}

fn default_low_max_affected() -> usize {
    2
}

fn default_medium_max_affected() -> usize {
    5
}

fn default_high_max_affected() -> usize {
    10
}

fn default_low_max_total_delay_days() -> i64 {
    2
}

fn default_medium_max_total_delay_days() -> i64 {
    7
}

fn default_true() -> bool {
    true
}

fn default_compress_min_affected() -> usize {
    5
}

fn default_shift_min_delay_days() -> i64 {
    7
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            low_max_affected: default_low_max_affected(),
            medium_max_affected: default_medium_max_affected(),
            high_max_affected: default_high_max_affected(),
            low_max_total_delay_days: default_low_max_total_delay_days(),
            medium_max_total_delay_days: default_medium_max_total_delay_days(),
            escalate_on_critical_path: default_true(),
            compress_min_affected: default_compress_min_affected(),
            shift_min_delay_days: default_shift_min_delay_days(),
        }
    }
}

/// `[stage.<id>]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    pub number_index: u32,

    pub name: String,

    pub category: StageCategory,

    #[serde(default)]
    pub status: StageStatus,

    pub start: NaiveDate,

    pub end: NaiveDate,

    /// Dependency list: this stage starts after all stages listed here.
    #[serde(default)]
    pub after: Vec<StageId>,

    #[serde(default)]
    pub deliverable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl StageConfig {
    pub fn to_stage(&self, id: &str) -> Stage {
        Stage {
            id: id.to_string(),
            number_index: self.number_index,
            name: self.name.clone(),
            category: self.category,
            status: self.status,
            start_date: self.start,
            end_date: self.end,
            dependencies: self.after.iter().cloned().collect(),
            is_deliverable: self.deliverable,
            assigned_to: self.assigned_to.clone(),
        }
    }
}
