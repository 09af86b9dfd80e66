// src/dag/critical_path.rs

//! Longest duration chain through the stage DAG.
//!
//! The critical path is the dependency chain with the largest cumulative
//! stage duration. Any delay on it delays the whole project, which is why
//! the schedule engine escalates cascades that touch it.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::dag::graph::StageGraph;
use crate::dag::stage::StageId;

/// Ordered critical path plus an O(1) membership set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalPath {
    stages: Vec<StageId>,
    members: HashSet<StageId>,
    total_days: i64,
}

impl CriticalPath {
    /// Compute the critical path of `graph`.
    ///
    /// Dynamic programming over a topological order: the best chain ending
    /// at a stage is its own duration plus the best chain among its direct
    /// dependencies. Ties go to the lowest `number_index`, both when picking
    /// a predecessor and when picking the final stage.
    pub fn compute(graph: &StageGraph) -> Self {
        let stages = graph.stages();
        if stages.is_empty() {
            return Self::default();
        }

        // Edge direction: dependency -> dependent.
        let mut dag: DiGraphMap<&str, ()> = DiGraphMap::new();
        for stage in &stages {
            dag.add_node(stage.id.as_str());
        }
        for (from, to) in graph.edges() {
            dag.add_edge(from, to, ());
        }

        let order = match toposort(&dag, None) {
            Ok(order) => order,
            Err(cycle) => {
                // StageGraph::build rejects cycles, so this is unreachable
                // for graphs built through the public API.
                warn!(stage = %cycle.node_id(), "cycle while computing critical path");
                return Self::default();
            }
        };

        let index_of = |id: &str| graph.stage(id).map(|s| s.number_index).unwrap_or(u32::MAX);

        // id -> (best total duration of a chain ending here, predecessor)
        let mut best: HashMap<&str, (i64, Option<&str>)> = HashMap::with_capacity(order.len());

        for id in order {
            let own = graph.stage(id).map(|s| s.duration_days()).unwrap_or(0);

            let mut pred: Option<(&str, i64)> = None;
            for dep in graph.dependency_ids(id) {
                let Some(&(dep_total, _)) = best.get(dep.as_str()) else {
                    continue;
                };
                let better = match pred {
                    None => true,
                    Some((current, current_total)) => {
                        dep_total > current_total
                            || (dep_total == current_total && index_of(dep.as_str()) < index_of(current))
                    }
                };
                if better {
                    pred = Some((dep.as_str(), dep_total));
                }
            }

            let total = own + pred.map(|(_, t)| t).unwrap_or(0);
            best.insert(id, (total, pred.map(|(p, _)| p)));
        }

        let mut end: Option<(&str, i64)> = None;
        for stage in &stages {
            let Some(&(total, _)) = best.get(stage.id.as_str()) else {
                continue;
            };
            // `stages` is in number_index order, so strict `>` keeps the
            // lowest index on ties.
            if end.map(|(_, t)| total > t).unwrap_or(true) {
                end = Some((stage.id.as_str(), total));
            }
        }

        let Some((end_id, total_days)) = end else {
            return Self::default();
        };

        let mut path: Vec<StageId> = Vec::new();
        let mut cursor = Some(end_id);
        while let Some(id) = cursor {
            path.push(id.to_string());
            cursor = best.get(id).and_then(|&(_, pred)| pred);
        }
        path.reverse();

        debug!(?path, total_days, "critical path computed");

        let members = path.iter().cloned().collect();
        Self {
            stages: path,
            members,
            total_days,
        }
    }

    /// Stage ids along the path, first to last.
    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    /// Sum of the durations of the stages on the path.
    pub fn total_days(&self) -> i64 {
        self.total_days
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether a stage lies on the critical path.
    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Whether `from -> to` is a consecutive hop of the path.
    pub fn is_critical_edge(&self, from: &str, to: &str) -> bool {
        self.stages
            .windows(2)
            .any(|pair| pair[0] == from && pair[1] == to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::stage::Stage;
    use crate::types::StageCategory;
    use chrono::NaiveDate;

    fn stage(id: &str, idx: u32, duration: i64, deps: &[&str]) -> Stage {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
        let end = start + chrono::Duration::days(duration);
        let mut s = Stage::new(id, idx, id, StageCategory::Research, start, end);
        s.dependencies = deps.iter().map(|d| d.to_string()).collect();
        s
    }

    #[test]
    fn empty_graph_has_empty_path() {
        let g = StageGraph::build(Vec::new()).unwrap();
        let cp = CriticalPath::compute(&g);
        assert!(cp.is_empty());
        assert_eq!(cp.total_days(), 0);
    }

    #[test]
    fn picks_heaviest_branch() {
        // a(1) -> b(5) -> d(1)
        // a(1) -> c(2) -> d(1)
        let g = StageGraph::build(vec![
            stage("a", 1, 1, &[]),
            stage("b", 2, 5, &["a"]),
            stage("c", 3, 2, &["a"]),
            stage("d", 4, 1, &["b", "c"]),
        ])
        .unwrap();

        let cp = CriticalPath::compute(&g);
        assert_eq!(cp.stages(), ["a", "b", "d"]);
        assert_eq!(cp.total_days(), 7);
        assert!(cp.contains("b"));
        assert!(!cp.contains("c"));
        assert!(cp.is_critical_edge("a", "b"));
        assert!(!cp.is_critical_edge("a", "c"));
    }

    #[test]
    fn ties_prefer_lowest_number_index() {
        // Two equal branches; "y" has the lower playbook index.
        let g = StageGraph::build(vec![
            stage("root", 1, 2, &[]),
            stage("x", 3, 4, &["root"]),
            stage("y", 2, 4, &["root"]),
            stage("lonely", 4, 6, &[]),
        ])
        .unwrap();

        let cp = CriticalPath::compute(&g);
        assert_eq!(cp.total_days(), 6);
        // root->y (6) ties with lonely (6); the chain ending at y wins on index.
        assert_eq!(cp.stages(), ["root", "y"]);
    }
}
