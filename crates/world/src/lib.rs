//! World model: infrastructure nodes and repair crews.
//!
//! Holds the mutable run state. No cross-entity invariants live here;
//! those belong to the tool layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// World model errors
#[derive(Error, Debug)]
pub enum WorldError {
    #[error("unknown node: {0}")]
    NodeNotFound(String),

    #[error("unknown crew: {0}")]
    CrewNotFound(String),
}

pub type Result<T> = std::result::Result<T, WorldError>;

/// Repair status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Operational,
    Broken,
    Repairing,
}

/// Availability of a crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CrewStatus {
    Available,
    Busy,
}

/// Infrastructure category a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Water,
    Power,
    Telecom,
    Internet,
}

/// Severity of losing a node. Ordering is Critical > High > Medium > Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

impl Criticality {
    /// Numeric rank used by the planner sort (Low=1 .. Critical=4)
    pub fn rank(self) -> u8 {
        match self {
            Criticality::Low => 1,
            Criticality::Medium => 2,
            Criticality::High => 3,
            Criticality::Critical => 4,
        }
    }
}

/// A managed infrastructure unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub population_affected: u64,
    pub criticality: Criticality,
}

/// A repair resource, assignable to at most one node within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crew {
    pub id: String,
    pub status: CrewStatus,
    /// Informational only, not matched against node kind
    #[serde(default)]
    pub specialty: String,
}

/// Static node/crew tables supplied at process start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSeed {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub crews: Vec<Crew>,
}

/// In-memory node/crew store.
///
/// Backed by vectors so iteration order is insertion order; failure
/// detection and crew enumeration stay reproducible across runs. Owned by
/// whoever drives the run and passed by reference into the tool layer, so
/// several independent worlds can coexist in one process.
#[derive(Debug, Clone)]
pub struct WorldModel {
    nodes: Vec<Node>,
    crews: Vec<Crew>,
}

impl WorldModel {
    /// Build a model from a seed, preserving table order
    pub fn from_seed(seed: WorldSeed) -> Self {
        Self {
            nodes: seed.nodes,
            crews: seed.crews,
        }
    }

    /// The built-in four-node, three-crew scenario used when no seed is
    /// supplied.
    pub fn demo() -> Self {
        Self::from_seed(WorldSeed {
            nodes: vec![
                Node {
                    id: "Node_Water_Pump_A".into(),
                    kind: NodeKind::Water,
                    status: NodeStatus::Broken,
                    population_affected: 5000,
                    criticality: Criticality::High,
                },
                Node {
                    id: "Node_Server_B".into(),
                    kind: NodeKind::Internet,
                    status: NodeStatus::Operational,
                    population_affected: 200,
                    criticality: Criticality::Low,
                },
                Node {
                    id: "Node_Power_Substation_C".into(),
                    kind: NodeKind::Power,
                    status: NodeStatus::Broken,
                    population_affected: 15000,
                    criticality: Criticality::Critical,
                },
                Node {
                    id: "Node_Relay_D".into(),
                    kind: NodeKind::Telecom,
                    status: NodeStatus::Operational,
                    population_affected: 1000,
                    criticality: Criticality::Medium,
                },
            ],
            crews: vec![
                Crew {
                    id: "Crew_Alpha".into(),
                    status: CrewStatus::Available,
                    specialty: "General".into(),
                },
                Crew {
                    id: "Crew_Beta".into(),
                    status: CrewStatus::Busy,
                    specialty: "Electrical".into(),
                },
                Crew {
                    id: "Crew_Gamma".into(),
                    status: CrewStatus::Busy,
                    specialty: "Water".into(),
                },
            ],
        })
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a crew by id
    pub fn crew(&self, id: &str) -> Option<&Crew> {
        self.crews.iter().find(|c| c.id == id)
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All crews, in insertion order
    pub fn crews(&self) -> &[Crew] {
        &self.crews
    }

    /// Set a node's status. Fails if the id is unknown.
    pub fn set_node_status(&mut self, id: &str, status: NodeStatus) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| WorldError::NodeNotFound(id.to_string()))?;
        debug!("node {} -> {:?}", id, status);
        node.status = status;
        Ok(())
    }

    /// Set a crew's status. Fails if the id is unknown.
    pub fn set_crew_status(&mut self, id: &str, status: CrewStatus) -> Result<()> {
        let crew = self
            .crews
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| WorldError::CrewNotFound(id.to_string()))?;
        debug!("crew {} -> {:?}", id, status);
        crew.status = status;
        Ok(())
    }
}
