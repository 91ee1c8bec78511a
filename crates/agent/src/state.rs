//! The five agent states and the transition table between them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the run currently is.
///
/// The lifecycle is strictly forward: DETECT -> ANALYZE -> PLAN -> ACT
/// -> FINAL, with ANALYZE looping on itself until every failed node has
/// an impact report. There is no backward edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    Detect,
    Analyze,
    Plan,
    Act,
    Final,
}

impl AgentState {
    /// Wire/display name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            AgentState::Detect => "DETECT",
            AgentState::Analyze => "ANALYZE",
            AgentState::Plan => "PLAN",
            AgentState::Act => "ACT",
            AgentState::Final => "FINAL",
        }
    }

    /// FINAL is absorbing; a run in FINAL takes no further steps.
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentState::Final)
    }

    /// PLAN is fully deterministic and FINAL takes no decisions, so
    /// neither consults the oracle.
    pub fn consults_oracle(self) -> bool {
        matches!(
            self,
            AgentState::Detect | AgentState::Analyze | AgentState::Act
        )
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
