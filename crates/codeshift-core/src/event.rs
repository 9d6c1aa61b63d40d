//! Events: the immutable entries of a run's log

use crate::error::Error;
use crate::types::{InvocationId, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request from the oracle to run one action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionInvocation {
    pub id: InvocationId,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ActionInvocation {
    pub fn new(id: impl Into<InvocationId>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Invocation with a generated id.
    pub fn generated(name: impl Into<String>, arguments: Value) -> Self {
        Self::new(InvocationId::generate(), name, arguments)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownAction,
    Execution,
    Timeout,
}

/// What an action produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Success { output: Value },
    Failure { kind: FailureKind, message: String },
}

impl ActionOutcome {
    pub fn success(output: impl Into<Value>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Render the outcome as the text handed back to the oracle.
    pub fn to_content_string(&self) -> String {
        match self {
            Self::Success {
                output: Value::String(s),
            } => s.clone(),
            Self::Success { output } => serde_json::to_string_pretty(output).unwrap_or_default(),
            Self::Failure { message, .. } => format!("Error: {}", message),
        }
    }
}

/// The recorded answer to one invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub invocation_id: InvocationId,
    pub name: String,
    pub outcome: ActionOutcome,
}

impl ActionResult {
    pub fn new(invocation: &ActionInvocation, outcome: ActionOutcome) -> Self {
        Self {
            invocation_id: invocation.id.clone(),
            name: invocation.name.clone(),
            outcome,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }

    /// The taxonomy error this result absorbed, if it is a failure.
    pub fn error(&self) -> Option<Error> {
        match &self.outcome {
            ActionOutcome::Success { .. } => None,
            ActionOutcome::Failure {
                kind: FailureKind::UnknownAction,
                ..
            } => Some(Error::UnknownAction(self.name.clone())),
            ActionOutcome::Failure {
                kind: FailureKind::Timeout,
                message,
            } => Some(Error::ActionTimeout {
                name: self.name.clone(),
                message: message.clone(),
            }),
            ActionOutcome::Failure { message, .. } => {
                Some(Error::action_error(self.name.clone(), message.clone()))
            }
        }
    }
}

/// One immutable log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Event {
    Human {
        content: String,
    },
    OracleDecision {
        #[serde(default)]
        content: String,
        invocations: Vec<ActionInvocation>,
    },
    ActionResult(ActionResult),
    Terminal {
        content: String,
    },
}

impl Event {
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            content: content.into(),
        }
    }

    pub fn decision(content: impl Into<String>, invocations: Vec<ActionInvocation>) -> Self {
        Self::OracleDecision {
            content: content.into(),
            invocations,
        }
    }

    pub fn result(result: ActionResult) -> Self {
        Self::ActionResult(result)
    }

    pub fn terminal(content: impl Into<String>) -> Self {
        Self::Terminal {
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Human { .. } => Role::Human,
            Self::OracleDecision { .. } => Role::OracleDecision,
            Self::ActionResult(_) => Role::ActionResult,
            Self::Terminal { .. } => Role::Terminal,
        }
    }

    /// Invocations requested by this event (empty unless it is a decision).
    pub fn invocations(&self) -> &[ActionInvocation] {
        match self {
            Self::OracleDecision { invocations, .. } => invocations,
            _ => &[],
        }
    }

    pub fn as_result(&self) -> Option<&ActionResult> {
        match self {
            Self::ActionResult(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    /// Check that an event returned by an oracle has one of the two allowed shapes:
    /// a terminal event, or a decision with at least one invocation.
    pub fn validate_oracle_output(self) -> Result<Self, Error> {
        match &self {
            Self::Terminal { .. } => Ok(self),
            Self::OracleDecision { invocations, .. } if invocations.is_empty() => Err(
                Error::malformed("decision carries no invocations"),
            ),
            Self::OracleDecision { invocations, .. } => {
                if let Some(bad) = invocations.iter().find(|i| i.name.trim().is_empty()) {
                    return Err(Error::malformed(format!(
                        "invocation {} has an empty action name",
                        bad.id
                    )));
                }
                let mut seen = std::collections::HashSet::new();
                for inv in invocations {
                    if !seen.insert(&inv.id) {
                        return Err(Error::malformed(format!(
                            "duplicate invocation id {}",
                            inv.id
                        )));
                    }
                }
                Ok(self)
            }
            other => Err(Error::malformed(format!(
                "oracle returned a {:?} event",
                other.role()
            ))),
        }
    }
}
