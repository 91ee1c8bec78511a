//! Prompt assembly for the oracle.
//!
//! The system prompt is static; everything run-specific travels in the
//! per-step context object so the oracle never has to remember anything
//! between calls.

use serde_json::{json, Value};

use gridmend_world::{CrewStatus, WorldModel};

use crate::planner::RepairPlan;
use crate::state::AgentState;
use crate::tools;

/// Static instructions sent as the system message on every call.
pub fn system_prompt() -> &'static str {
    r#"You coordinate infrastructure repairs. You are consulted one step at a time; each step you receive the current state and must answer with a single JSON object, nothing else:

{"thought": "<brief reasoning>", "action": "<action name>", "arguments": {<action arguments>}}

Actions by state:
- DETECT: {"action": "detect_failure_nodes", "arguments": {}}
- ANALYZE: {"action": "estimate_impact", "arguments": {"node_id": "<the first node in remaining_to_analyze>"}}
- ACT: {"action": "assign_repair_crew", "arguments": {}}

Example:
{"thought": "Node_Water_Pump_A is the next unanalyzed failure.", "action": "estimate_impact", "arguments": {"node_id": "Node_Water_Pump_A"}}

Answer with the JSON object only."#
}

/// Snapshot of the run handed to the oracle as the user message.
pub fn context_json(
    state: AgentState,
    world: &WorldModel,
    failed: &[String],
    analyzed: &[String],
    remaining: &[String],
    plan: Option<&RepairPlan>,
) -> Value {
    let available: Vec<&str> = world
        .crews()
        .iter()
        .filter(|c| c.status == CrewStatus::Available)
        .map(|c| c.id.as_str())
        .collect();
    let busy: Vec<&str> = world
        .crews()
        .iter()
        .filter(|c| c.status == CrewStatus::Busy)
        .map(|c| c.id.as_str())
        .collect();

    let mut context = json!({
        "state": state.name(),
        "failed_nodes": failed,
        "analyzed_nodes": analyzed,
        "remaining_to_analyze": remaining,
        "available_crews": available,
        "busy_crews": busy,
        "all_crews_status": tools::check_crew_availability(world),
    });

    if let Some(plan) = plan {
        context["plan"] = json!({
            "assignments": plan.assignments,
            "unassigned": plan.unassigned,
        });
    }

    context
}
