#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use princess::dag::{Stage, StageGraph};
use princess::types::{StageCategory, StageStatus};

/// Fixed project start used by all builders: Monday 2 March 2026.
pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid base date")
}

/// `base_date() + n` days.
pub fn day(n: i64) -> NaiveDate {
    base_date() + Duration::days(n)
}

/// Builder for `Stage` to simplify test setup.
///
/// Dates are given as day offsets from [`base_date`].
pub struct StageBuilder {
    stage: Stage,
}

impl StageBuilder {
    /// Stage `id` starting on day 0 and lasting `duration` days.
    pub fn new(id: &str, number_index: u32) -> Self {
        Self {
            stage: Stage::new(
                id,
                number_index,
                id.to_uppercase(),
                StageCategory::Strategy,
                day(0),
                day(1),
            ),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.stage.name = name.to_string();
        self
    }

    pub fn category(mut self, category: StageCategory) -> Self {
        self.stage.category = category;
        self
    }

    /// Window `[day(start), day(start + duration)]`.
    pub fn days(mut self, start: i64, duration: i64) -> Self {
        self.stage.start_date = day(start);
        self.stage.end_date = day(start + duration);
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.stage.dependencies.insert(dep.to_string());
        self
    }

    pub fn status(mut self, status: StageStatus) -> Self {
        self.stage.status = status;
        self
    }

    pub fn completed(self) -> Self {
        self.status(StageStatus::Completed)
    }

    pub fn deliverable(mut self) -> Self {
        self.stage.is_deliverable = true;
        self
    }

    pub fn assigned_to(mut self, who: &str) -> Self {
        self.stage.assigned_to = Some(who.to_string());
        self
    }

    pub fn build(self) -> Stage {
        self.stage
    }
}

/// Build a graph, panicking on invalid test data.
pub fn graph(stages: Vec<Stage>) -> StageGraph {
    StageGraph::build(stages).expect("Failed to build valid graph from builder")
}

/// Linear chain `s1 -> s2 -> ...` with back-to-back windows.
pub fn chain(durations: &[i64]) -> Vec<Stage> {
    let mut stages = Vec::new();
    let mut start = 0;
    for (i, &duration) in durations.iter().enumerate() {
        let mut b = StageBuilder::new(&format!("s{}", i + 1), (i + 1) as u32).days(start, duration);
        if i > 0 {
            b = b.after(&format!("s{}", i));
        }
        stages.push(b.build());
        start += duration;
    }
    stages
}

/// Minimal TOML project file text for the given stages.
pub fn project_toml(name: &str, stages: &[Stage]) -> String {
    let mut out = format!("[project]\nname = \"{name}\"\n");
    for s in stages {
        out.push_str(&format!(
            "\n[stage.{id}]\nnumber_index = {idx}\nname = \"{n}\"\ncategory = \"{cat}\"\nstatus = \"{status}\"\nstart = \"{start}\"\nend = \"{end}\"\n",
            id = s.id,
            idx = s.number_index,
            n = s.name,
            cat = s.category,
            status = s.status,
            start = s.start_date,
            end = s.end_date,
        ));
        if !s.dependencies.is_empty() {
            let deps: Vec<String> = s.dependencies.iter().map(|d| format!("\"{d}\"")).collect();
            out.push_str(&format!("after = [{}]\n", deps.join(", ")));
        }
    }
    out
}
