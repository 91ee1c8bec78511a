//! Deterministic repair planner.
//!
//! Pure function of its inputs: no oracle, no randomness, no clock.
//! Identical impact reports and crew roster always yield the same plan.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gridmend_world::{CrewStatus, WorldModel};

use crate::tools::ImpactReport;

/// One node/crew pairing chosen by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAssignment {
    pub node_id: String,
    pub crew_id: String,
}

/// The planner's output: pairings plus the nodes that did not get a crew
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairPlan {
    pub assignments: Vec<PlannedAssignment>,
    pub unassigned: Vec<String>,
}

impl RepairPlan {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.assignments.iter().map(|a| a.node_id.clone()).collect()
    }

    pub fn crew_ids(&self) -> Vec<String> {
        self.assignments.iter().map(|a| a.crew_id.clone()).collect()
    }
}

/// Rank nodes by urgency and pair them with available crews.
///
/// Sort key is (criticality rank, population affected), both descending.
/// The sort is stable, so reports that tie on both keys keep their input
/// order. Crews are taken in roster order and each crew appears at most
/// once. Nodes beyond the crew supply land in `unassigned`.
pub fn build_plan(world: &WorldModel, reports: &[ImpactReport]) -> RepairPlan {
    let mut ranked: Vec<&ImpactReport> = reports.iter().collect();
    ranked.sort_by(|a, b| {
        (b.criticality.rank(), b.population_affected)
            .cmp(&(a.criticality.rank(), a.population_affected))
    });

    let available: Vec<&str> = world
        .crews()
        .iter()
        .filter(|c| c.status == CrewStatus::Available)
        .map(|c| c.id.as_str())
        .collect();

    let mut plan = RepairPlan::default();
    for (i, report) in ranked.iter().enumerate() {
        match available.get(i) {
            Some(crew_id) => plan.assignments.push(PlannedAssignment {
                node_id: report.node_id.clone(),
                crew_id: (*crew_id).to_string(),
            }),
            None => plan.unassigned.push(report.node_id.clone()),
        }
    }

    if !plan.unassigned.is_empty() {
        warn!(
            "{} node(s) left unassigned, no crews remain: {:?}",
            plan.unassigned.len(),
            plan.unassigned
        );
    }
    info!(
        assignments = plan.assignments.len(),
        unassigned = plan.unassigned.len(),
        "plan built"
    );

    plan
}
