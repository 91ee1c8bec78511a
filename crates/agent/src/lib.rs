//! Agent core: the state machine, its tools, and the planner.
//!
//! The driver owns a world and an oracle and turns oracle proposals
//! into validated actions, one step at a time, until FINAL or the
//! step budget.

pub mod driver;
pub mod memory;
pub mod planner;
pub mod prompt;
pub mod state;
pub mod tools;
pub mod validation;

pub use driver::{FsmDriver, RunOutcome, DEFAULT_MAX_STEPS};
pub use memory::{AgentMemory, RunRecord, StepRecord};
pub use planner::{build_plan, PlannedAssignment, RepairPlan};
pub use state::AgentState;
pub use tools::{
    assign_repair_crew, check_crew_availability, detect_failure_nodes, estimate_impact,
    AssignmentOutcome, AssignmentReport, AssignmentResult, ImpactReport, ToolError,
};
pub use validation::{resolve, ResolvedAction, Resolution, RuntimeFacts};
