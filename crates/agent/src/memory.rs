//! Accumulated run state and the serializable run record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::planner::RepairPlan;
use crate::state::AgentState;
use crate::tools::{AssignmentReport, ImpactReport};

/// Everything the run has learned so far.
///
/// Filled strictly forward: detection populates `failed_nodes`, each
/// ANALYZE step appends one report, PLAN sets `plan`, ACT sets
/// `assignment_report`. Nothing is ever removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMemory {
    pub failed_nodes: Vec<String>,
    pub impact_reports: Vec<ImpactReport>,
    pub plan: Option<RepairPlan>,
    pub assignment_report: Option<AssignmentReport>,
}

impl AgentMemory {
    /// Ids already covered by an impact report.
    pub fn analyzed(&self) -> Vec<String> {
        self.impact_reports
            .iter()
            .map(|r| r.node_id.clone())
            .collect()
    }

    /// Failed nodes with no report yet, in detection order.
    pub fn remaining(&self) -> Vec<String> {
        self.failed_nodes
            .iter()
            .filter(|id| !self.impact_reports.iter().any(|r| &r.node_id == *id))
            .cloned()
            .collect()
    }
}

/// One executed step, as it appears in the exported run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u32,
    pub state: AgentState,
    /// The oracle's stated reasoning, empty when it was not consulted.
    #[serde(default)]
    pub reasoning: String,
    /// Wire name of the action that actually ran.
    pub action: String,
    pub overridden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Compact description of what the action returned.
    pub observation: String,
}

/// The full, exportable account of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True iff the run reached FINAL within the step budget.
    pub completed: bool,
    pub steps: Vec<StepRecord>,
    pub memory: AgentMemory,
}
