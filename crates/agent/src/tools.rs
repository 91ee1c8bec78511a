//! Tool layer: deterministic operations over the world model.
//!
//! Every operation validates its own preconditions and reports failures
//! as data. Only `assign_repair_crew` mutates the world.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use gridmend_world::{Criticality, CrewStatus, NodeKind, NodeStatus, WorldModel};

/// Tool-level failures that abort a single operation, never the run
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown node: {0}")]
    NodeNotFound(String),

    #[error("length mismatch: {nodes} nodes vs {crews} crews")]
    ArgumentMismatch { nodes: usize, crews: usize },
}

/// Impact metrics for one node, frozen at estimation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactReport {
    pub node_id: String,
    pub kind: NodeKind,
    pub population_affected: u64,
    pub criticality: Criticality,
}

/// Per-pair outcome of a bulk assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentResult {
    Dispatched,
    InvalidId,
    CrewBusy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub node_id: String,
    pub crew_id: String,
    pub result: AssignmentResult,
}

/// Full per-pair outcome map of one `assign_repair_crew` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub outcomes: Vec<AssignmentOutcome>,
}

impl AssignmentReport {
    pub fn dispatched_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result == AssignmentResult::Dispatched)
            .count()
    }
}

/// Ids of nodes currently Broken, in world insertion order.
pub fn detect_failure_nodes(world: &WorldModel) -> Vec<String> {
    world
        .nodes()
        .iter()
        .filter(|n| n.status == NodeStatus::Broken)
        .map(|n| n.id.clone())
        .collect()
}

/// Impact metrics for a specific node.
pub fn estimate_impact(world: &WorldModel, node_id: &str) -> Result<ImpactReport, ToolError> {
    let node = world
        .node(node_id)
        .ok_or_else(|| ToolError::NodeNotFound(node_id.to_string()))?;
    Ok(ImpactReport {
        node_id: node.id.clone(),
        kind: node.kind,
        population_affected: node.population_affected,
        criticality: node.criticality,
    })
}

/// Snapshot of every crew's status, keyed by id.
pub fn check_crew_availability(world: &WorldModel) -> BTreeMap<String, CrewStatus> {
    world
        .crews()
        .iter()
        .map(|c| (c.id.clone(), c.status))
        .collect()
}

/// Dispatch crews to nodes pairwise.
///
/// Fails up front on a length mismatch without touching the world.
/// Otherwise each pair succeeds or fails on its own, applied in pair
/// order with no rollback: this is a partial-failure-tolerant bulk
/// operation, not a transaction.
pub fn assign_repair_crew(
    world: &mut WorldModel,
    node_ids: &[String],
    crew_ids: &[String],
) -> Result<AssignmentReport, ToolError> {
    if node_ids.len() != crew_ids.len() {
        return Err(ToolError::ArgumentMismatch {
            nodes: node_ids.len(),
            crews: crew_ids.len(),
        });
    }

    let mut report = AssignmentReport::default();
    for (node_id, crew_id) in node_ids.iter().zip(crew_ids) {
        let result = match (world.node(node_id), world.crew(crew_id)) {
            (None, _) | (_, None) => AssignmentResult::InvalidId,
            (Some(_), Some(crew)) if crew.status != CrewStatus::Available => {
                AssignmentResult::CrewBusy
            }
            _ => {
                // both ids verified just above
                world.set_node_status(node_id, NodeStatus::Repairing).ok();
                world.set_crew_status(crew_id, CrewStatus::Busy).ok();
                debug!("dispatched {} to {}", crew_id, node_id);
                AssignmentResult::Dispatched
            }
        };
        report.outcomes.push(AssignmentOutcome {
            node_id: node_id.clone(),
            crew_id: crew_id.clone(),
            result,
        });
    }

    Ok(report)
}
