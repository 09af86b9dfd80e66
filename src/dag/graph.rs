use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::dag::stage::{DateWindow, Stage, StageId};
use crate::errors::{PrincessError, Result};
use crate::types::StageStatus;

static NO_STAGES: BTreeSet<StageId> = BTreeSet::new();

/// Internal node structure: the stage itself plus its dependents.
///
/// Dependencies live on the stage (`Stage::dependencies`); dependents are
/// derived at build time so both directions are a single lookup.
#[derive(Debug, Clone)]
struct StageNode {
    stage: Stage,
    dependents: BTreeSet<StageId>,
}

/// In-memory DAG of stages keyed by stage id.
///
/// A graph is built from a snapshot of the project's stages and handed
/// explicitly to the schedule engine; there is no shared instance.
#[derive(Debug, Clone)]
pub struct StageGraph {
    nodes: HashMap<StageId, StageNode>,
}

impl StageGraph {
    /// Build a graph from a stage list.
    ///
    /// Fails on duplicate ids, dangling or self dependencies, inverted date
    /// windows, and dependency cycles.
    pub fn build(stages: impl IntoIterator<Item = Stage>) -> Result<Self> {
        let mut nodes: HashMap<StageId, StageNode> = HashMap::new();

        // First pass: create nodes and check per-stage sanity.
        for stage in stages {
            if stage.end_date < stage.start_date {
                return Err(PrincessError::InvalidStage(format!(
                    "stage '{}' ends ({}) before it starts ({})",
                    stage.id, stage.end_date, stage.start_date
                )));
            }
            if stage.dependencies.contains(&stage.id) {
                return Err(PrincessError::InvalidStage(format!(
                    "stage '{}' cannot depend on itself",
                    stage.id
                )));
            }
            if nodes.contains_key(&stage.id) {
                return Err(PrincessError::DuplicateStage(stage.id));
            }
            nodes.insert(
                stage.id.clone(),
                StageNode {
                    stage,
                    dependents: BTreeSet::new(),
                },
            );
        }

        // Second pass: populate dependents based on dependencies.
        let edges: Vec<(StageId, StageId)> = nodes
            .values()
            .flat_map(|n| {
                n.stage
                    .dependencies
                    .iter()
                    .map(move |dep| (dep.clone(), n.stage.id.clone()))
            })
            .collect();

        for (from, to) in edges {
            match nodes.get_mut(&from) {
                Some(node) => {
                    node.dependents.insert(to);
                }
                None => {
                    return Err(PrincessError::UnknownDependency {
                        stage: to,
                        dependency: from,
                    });
                }
            }
        }

        let graph = Self { nodes };
        if let Some(cycle) = graph.find_cycle() {
            return Err(PrincessError::CycleDetected(cycle.join(" -> ")));
        }

        debug!(stages = graph.nodes.len(), "stage graph built");
        Ok(graph)
    }

    /// Depth-first search with a recursion-stack marker.
    ///
    /// Returns the first cycle found as a closed path (`a -> b -> a`).
    fn find_cycle(&self) -> Option<Vec<StageId>> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            OnStack,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();

        for root in self.ids_in_playbook_order() {
            if marks.contains_key(root) {
                continue;
            }

            // Each frame is a node plus the dependents still to visit.
            let mut stack: Vec<(&str, Vec<&str>)> = vec![(root, self.dependent_refs(root))];
            marks.insert(root, Mark::OnStack);

            loop {
                let next = match stack.last_mut() {
                    Some((_, pending)) => pending.pop(),
                    None => break,
                };

                match next {
                    Some(child) => match marks.get(child) {
                        Some(Mark::OnStack) => {
                            let from = stack.iter().position(|(n, _)| *n == child).unwrap_or(0);
                            let mut cycle: Vec<StageId> =
                                stack[from..].iter().map(|(n, _)| n.to_string()).collect();
                            cycle.push(child.to_string());
                            return Some(cycle);
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(child, Mark::OnStack);
                            stack.push((child, self.dependent_refs(child)));
                        }
                    },
                    None => {
                        if let Some((done, _)) = stack.pop() {
                            marks.insert(done, Mark::Done);
                        }
                    }
                }
            }
        }

        None
    }

    fn dependent_refs(&self, id: &str) -> Vec<&str> {
        // Reversed so that popping visits dependents in ascending id order.
        self.dependent_ids(id).iter().rev().map(|s| s.as_str()).collect()
    }

    fn ids_in_playbook_order(&self) -> Vec<&str> {
        self.stages().into_iter().map(|s| s.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.nodes.get(id).map(|n| &n.stage)
    }

    /// All stages, sorted by playbook `number_index` (then id).
    pub fn stages(&self) -> Vec<&Stage> {
        let mut stages: Vec<&Stage> = self.nodes.values().map(|n| &n.stage).collect();
        stages.sort_by(|a, b| a.number_index.cmp(&b.number_index).then_with(|| a.id.cmp(&b.id)));
        stages
    }

    /// Owned copy of every stage in playbook order, e.g. for persistence.
    pub fn to_stages(&self) -> Vec<Stage> {
        self.stages().into_iter().cloned().collect()
    }

    /// Ids of the direct dependencies of a stage.
    pub fn dependency_ids(&self, id: &str) -> &BTreeSet<StageId> {
        self.nodes
            .get(id)
            .map(|n| &n.stage.dependencies)
            .unwrap_or(&NO_STAGES)
    }

    /// Ids of the direct dependents of a stage.
    pub fn dependent_ids(&self, id: &str) -> &BTreeSet<StageId> {
        self.nodes
            .get(id)
            .map(|n| &n.dependents)
            .unwrap_or(&NO_STAGES)
    }

    /// Direct predecessors of a stage.
    pub fn dependencies_of(&self, id: &str) -> Vec<&Stage> {
        self.dependency_ids(id)
            .iter()
            .filter_map(|dep| self.stage(dep))
            .collect()
    }

    /// Direct successors of a stage.
    pub fn dependents_of(&self, id: &str) -> Vec<&Stage> {
        self.dependent_ids(id)
            .iter()
            .filter_map(|dep| self.stage(dep))
            .collect()
    }

    /// Whether `descendant` transitively depends on `ancestor`.
    pub fn is_descendant(&self, ancestor: &str, descendant: &str) -> bool {
        let mut stack: Vec<&str> = self.dependent_ids(ancestor).iter().map(|s| s.as_str()).collect();
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if current == descendant {
                return true;
            }
            stack.extend(self.dependent_ids(current).iter().map(|s| s.as_str()));
        }

        false
    }

    /// Every stage that transitively depends on `id`, in breadth-first order.
    pub fn descendants_of(&self, id: &str) -> Vec<&str> {
        let mut queue: VecDeque<&str> = self.dependent_ids(id).iter().map(|s| s.as_str()).collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            queue.extend(self.dependent_ids(current).iter().map(|s| s.as_str()));
        }

        order
    }

    /// Stages with no dependencies, in playbook order.
    pub fn roots(&self) -> Vec<&Stage> {
        self.stages()
            .into_iter()
            .filter(|s| s.dependencies.is_empty())
            .collect()
    }

    /// All dependency edges as `(from, to)` where `to` depends on `from`.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .nodes
            .values()
            .flat_map(|n| {
                n.stage
                    .dependencies
                    .iter()
                    .map(move |dep| (dep.as_str(), n.stage.id.as_str()))
            })
            .collect();
        edges.sort();
        edges
    }

    /// Direct dependencies that have not completed yet.
    pub fn blocking_dependencies(&self, id: &str) -> Vec<&Stage> {
        let mut blocking: Vec<&Stage> = self
            .dependencies_of(id)
            .into_iter()
            .filter(|s| !s.is_completed())
            .collect();
        blocking.sort_by_key(|s| s.number_index);
        blocking
    }

    /// Whether every direct dependency of `id` has completed.
    ///
    /// Returns `None` if the stage is unknown.
    pub fn can_start(&self, id: &str) -> Option<bool> {
        if !self.contains(id) {
            return None;
        }
        Some(self.blocking_dependencies(id).is_empty())
    }

    /// Latest end date among the direct dependencies of `id`.
    pub fn latest_dependency_end(&self, id: &str) -> Option<chrono::NaiveDate> {
        self.dependencies_of(id).iter().map(|s| s.end_date).max()
    }

    /// Update the status of a stage.
    pub fn set_status(&mut self, id: &str, status: StageStatus) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| PrincessError::StageNotFound(id.to_string()))?;

        if node.stage.status != status {
            debug!(stage = %id, from = %node.stage.status, to = %status, "stage status changed");
            node.stage.status = status;
        }
        Ok(())
    }

    /// Replace the dates of a stage.
    ///
    /// Completed stages are frozen and refuse new dates.
    pub fn set_window(&mut self, id: &str, window: DateWindow) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| PrincessError::StageNotFound(id.to_string()))?;

        if node.stage.is_completed() && node.stage.window() != window {
            return Err(PrincessError::InvalidMove(format!(
                "stage '{id}' is completed; its dates are frozen"
            )));
        }

        node.stage.set_window(window);
        Ok(())
    }
}
