// src/config/validate.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ProjectFile, RawProjectFile};
use crate::errors::{PrincessError, Result};

impl TryFrom<RawProjectFile> for ProjectFile {
    type Error = crate::errors::PrincessError;

    fn try_from(raw: RawProjectFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_project(&raw)?;
        Ok(ProjectFile::new_unchecked(raw.project, raw.policy, raw.stage))
    }
}

fn validate_raw_project(cfg: &RawProjectFile) -> Result<()> {
    ensure_has_stages(cfg)?;
    validate_policy(cfg)?;
    validate_stage_dates(cfg)?;
    validate_number_indices(cfg)?;
    validate_stage_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_stages(cfg: &RawProjectFile) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(PrincessError::ConfigError(
            "project must contain at least one [stage.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_policy(cfg: &RawProjectFile) -> Result<()> {
    let p = &cfg.policy;

    if !(p.low_max_affected <= p.medium_max_affected && p.medium_max_affected <= p.high_max_affected) {
        return Err(PrincessError::ConfigError(format!(
            "[policy] affected thresholds must ascend (low {} <= medium {} <= high {})",
            p.low_max_affected, p.medium_max_affected, p.high_max_affected
        )));
    }

    if p.low_max_total_delay_days > p.medium_max_total_delay_days {
        return Err(PrincessError::ConfigError(format!(
            "[policy] total delay thresholds must ascend (low {} <= medium {})",
            p.low_max_total_delay_days, p.medium_max_total_delay_days
        )));
    }

    if p.low_max_total_delay_days < 0 || p.shift_min_delay_days < 0 {
        return Err(PrincessError::ConfigError(
            "[policy] day thresholds must be >= 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_stage_dates(cfg: &RawProjectFile) -> Result<()> {
    for (id, stage) in cfg.stage.iter() {
        if stage.end < stage.start {
            return Err(PrincessError::ConfigError(format!(
                "stage '{}' ends ({}) before it starts ({})",
                id, stage.end, stage.start
            )));
        }
    }
    Ok(())
}

fn validate_number_indices(cfg: &RawProjectFile) -> Result<()> {
    let mut seen: HashMap<u32, &str> = HashMap::new();
    for (id, stage) in cfg.stage.iter() {
        if stage.number_index == 0 {
            return Err(PrincessError::ConfigError(format!(
                "stage '{}' has number_index 0 (playbook indices start at 1)",
                id
            )));
        }
        if let Some(other) = seen.insert(stage.number_index, id.as_str()) {
            return Err(PrincessError::ConfigError(format!(
                "stages '{}' and '{}' share number_index {}",
                other, id, stage.number_index
            )));
        }
    }
    Ok(())
}

fn validate_stage_dependencies(cfg: &RawProjectFile) -> Result<()> {
    for (id, stage) in cfg.stage.iter() {
        for dep in stage.after.iter() {
            if !cfg.stage.contains_key(dep) {
                return Err(PrincessError::ConfigError(format!(
                    "stage '{}' has unknown dependency '{}' in `after`",
                    id, dep
                )));
            }
            if dep == id {
                return Err(PrincessError::ConfigError(format!(
                    "stage '{}' cannot depend on itself in `after`",
                    id
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawProjectFile) -> Result<()> {
    // Edge direction: dep -> stage.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in cfg.stage.keys() {
        graph.add_node(id.as_str());
    }

    for (id, stage) in cfg.stage.iter() {
        for dep in stage.after.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PrincessError::CycleDetected(format!(
            "cycle detected in stage DAG involving stage '{}'",
            cycle.node_id()
        ))),
    }
}
