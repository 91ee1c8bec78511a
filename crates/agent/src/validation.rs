//! Validation and auto-correction of oracle proposals.
//!
//! Each state has exactly one legal action shape. A proposal that does
//! not match it is not an error: it is overridden to the legal action
//! and the override is recorded so the run log shows what the oracle
//! wanted versus what actually ran. The world only ever sees the output
//! of this layer.

use serde::{Deserialize, Serialize};
use tracing::warn;

use gridmend_oracle::Decision;

use crate::planner::RepairPlan;
use crate::state::AgentState;

/// An action that is legal to execute, with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResolvedAction {
    DetectFailures,
    EstimateImpact {
        node_id: String,
    },
    AssignCrews {
        node_ids: Vec<String>,
        crew_ids: Vec<String>,
    },
    Finish,
}

impl ResolvedAction {
    /// Wire token for the action, as the oracle would name it.
    pub fn name(&self) -> &'static str {
        match self {
            ResolvedAction::DetectFailures => "detect_failure_nodes",
            ResolvedAction::EstimateImpact { .. } => "estimate_impact",
            ResolvedAction::AssignCrews { .. } => "assign_repair_crew",
            ResolvedAction::Finish => "none",
        }
    }
}

/// Run facts the resolver checks proposals against.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeFacts<'a> {
    /// Failed nodes not yet analyzed, in detection order.
    pub remaining: &'a [String],
    /// The built plan, present once PLAN has run.
    pub plan: Option<&'a RepairPlan>,
}

/// Outcome of resolving one proposal.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub action: ResolvedAction,
    /// True when the executed action differs from the proposal.
    pub overridden: bool,
    /// Human-readable account of why, present iff overridden.
    pub note: Option<String>,
}

impl Resolution {
    fn accepted(action: ResolvedAction) -> Self {
        Self {
            action,
            overridden: false,
            note: None,
        }
    }

    fn corrected(action: ResolvedAction, note: String) -> Self {
        warn!("override: {}", note);
        Self {
            action,
            overridden: true,
            note: Some(note),
        }
    }
}

/// Resolve an oracle proposal (or its absence) into the legal action
/// for the current state.
///
/// `proposal` is `None` when the oracle was not consulted or failed;
/// the legal action runs either way. An absent proposal counts as an
/// override so the log shows the step ran without oracle input.
pub fn resolve(state: AgentState, proposal: Option<&Decision>, facts: RuntimeFacts<'_>) -> Resolution {
    match state {
        AgentState::Detect => resolve_simple(
            proposal,
            ResolvedAction::DetectFailures,
            "detect_failure_nodes",
        ),
        AgentState::Analyze => resolve_analyze(proposal, facts),
        AgentState::Act => resolve_act(proposal, facts),
        // PLAN is handled by the driver without an oracle; FINAL takes
        // no actions. Reaching here is a driver bug, answered with the
        // no-op rather than a panic.
        AgentState::Plan | AgentState::Final => Resolution::corrected(
            ResolvedAction::Finish,
            format!("no oracle action defined in {}", state),
        ),
    }
}

fn resolve_simple(
    proposal: Option<&Decision>,
    legal: ResolvedAction,
    expected: &str,
) -> Resolution {
    match proposal {
        Some(d) if d.action == expected => Resolution::accepted(legal),
        Some(d) => Resolution::corrected(
            legal,
            format!("proposed '{}', forced '{}'", d.action, expected),
        ),
        None => Resolution::corrected(legal, format!("no proposal, forced '{}'", expected)),
    }
}

fn resolve_analyze(proposal: Option<&Decision>, facts: RuntimeFacts<'_>) -> Resolution {
    let next = match facts.remaining.first() {
        Some(id) => id.clone(),
        // nothing left to analyze; the driver normally transitions
        // before asking, so this is a belt only
        None => {
            return Resolution::corrected(
                ResolvedAction::Finish,
                "nothing left to analyze".to_string(),
            )
        }
    };
    let legal = ResolvedAction::EstimateImpact {
        node_id: next.clone(),
    };

    match proposal {
        Some(d) if d.action == "estimate_impact" => {
            let proposed = d.arguments["node_id"].as_str().unwrap_or("");
            if proposed == next {
                Resolution::accepted(legal)
            } else {
                Resolution::corrected(
                    legal,
                    format!("proposed node '{}', forced next unanalyzed '{}'", proposed, next),
                )
            }
        }
        Some(d) => Resolution::corrected(
            legal,
            format!("proposed '{}', forced 'estimate_impact'", d.action),
        ),
        None => Resolution::corrected(
            legal,
            "no proposal, forced 'estimate_impact'".to_string(),
        ),
    }
}

fn resolve_act(proposal: Option<&Decision>, facts: RuntimeFacts<'_>) -> Resolution {
    let plan = match facts.plan {
        Some(p) if !p.is_empty() => p,
        _ => {
            return Resolution::corrected(
                ResolvedAction::Finish,
                "no assignments planned".to_string(),
            )
        }
    };
    let legal = ResolvedAction::AssignCrews {
        node_ids: plan.node_ids(),
        crew_ids: plan.crew_ids(),
    };

    // Arguments are always taken from the plan, never from the oracle.
    // Only the action name can be "accepted"; matching arguments are a
    // coincidence, differing ones are silently irrelevant.
    match proposal {
        Some(d) if d.action == "assign_repair_crew" => Resolution::accepted(legal),
        Some(d) => Resolution::corrected(
            legal,
            format!("proposed '{}', forced 'assign_repair_crew'", d.action),
        ),
        None => Resolution::corrected(
            legal,
            "no proposal, forced 'assign_repair_crew'".to_string(),
        ),
    }
}
