// src/dag/plan.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, SitepipeError};
use crate::tasks::TaskRegistry;
use crate::types::TaskName;

/// Validated run order of the registered tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    order: Vec<TaskName>,
}

impl BuildPlan {
    /// Check every `after` reference and order the tasks so that each one
    /// comes after its dependencies. Independent tasks keep their
    /// registration order.
    pub fn from_registry(registry: &TaskRegistry) -> Result<Self> {
        let entries: Vec<(TaskName, Vec<TaskName>)> = registry
            .iter()
            .map(|t| (t.name(), t.dependencies().to_vec()))
            .collect();
        Self::from_dependencies(&entries)
    }

    /// Same as [`BuildPlan::from_registry`] over `(task, after)` pairs in
    /// registration order.
    pub fn from_dependencies(entries: &[(TaskName, Vec<TaskName>)]) -> Result<Self> {
        validate_references(entries)?;
        validate_acyclic(entries)?;

        let mut remaining: Vec<(TaskName, Vec<TaskName>)> = entries.to_vec();
        let mut order = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            // Acyclic, so some task always has all dependencies placed.
            let Some(pos) = remaining
                .iter()
                .position(|(_, deps)| deps.iter().all(|d| order.contains(d)))
            else {
                return Err(SitepipeError::PlanCycle(format!("{:?}", remaining)));
            };
            order.push(remaining.remove(pos).0);
        }

        Ok(Self { order })
    }

    pub fn order(&self) -> &[TaskName] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn validate_references(entries: &[(TaskName, Vec<TaskName>)]) -> Result<()> {
    for (name, deps) in entries {
        for dep in deps {
            if dep == name {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{}' cannot run after itself",
                    name
                )));
            }
            if !entries.iter().any(|(other, _)| other == dep) {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{}' runs after unknown task '{}'",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_acyclic(entries: &[(TaskName, Vec<TaskName>)]) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<TaskName, ()> = DiGraphMap::new();
    for (name, _) in entries {
        graph.add_node(*name);
    }
    for (name, deps) in entries {
        for dep in deps {
            graph.add_edge(*dep, *name, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(cycle) => Err(SitepipeError::PlanCycle(format!(
            "cycle in task order involving task '{}'",
            cycle.node_id()
        ))),
    }
}
