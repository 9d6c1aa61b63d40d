//! Action registry and dispatcher
//!
//! Each action is a self-contained module implementing the Action trait.
//! Dispatch never fails: unknown names, errors, panics and deadline expiry all
//! come back as failure results so the oracle can see them and self-correct.

use codeshift_core::{ActionInvocation, ActionOutcome, ActionResult, ActionSchema, FailureKind};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub enum ActionOutput {
    Text(String),
    Json(Value),
    Error(String),
}

impl ActionOutput {
    pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }
    pub fn error(s: impl Into<String>) -> Self { Self::Error(s.into()) }

    pub fn is_error(&self) -> bool { matches!(self, Self::Error(_)) }

    pub fn into_outcome(self) -> ActionOutcome {
        match self {
            Self::Text(s) => ActionOutcome::success(s),
            Self::Json(v) => ActionOutcome::success(v),
            Self::Error(e) => ActionOutcome::failure(FailureKind::Execution, e),
        }
    }
}

/// The Action trait: implement this to add a new side-effecting operation.
#[async_trait::async_trait]
pub trait Action: Send + Sync {
    /// Registered name the oracle invokes (e.g. "list_files").
    fn name(&self) -> &str;

    /// Human-readable description sent to the oracle.
    fn description(&self) -> &str;

    /// System prompt fragment for this action.
    fn prompt(&self) -> &str { "" }

    /// JSON Schema for input arguments.
    fn input_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> ActionOutput;

    fn to_schema(&self) -> ActionSchema {
        ActionSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self { Self::default() }

    /// Register an action. Replaces any existing action with the same name.
    pub fn register(&mut self, action: impl Action + 'static) {
        let name = action.name().to_string();
        self.actions.insert(name, Arc::new(action));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn list(&self) -> Vec<&str> {
        self.actions.keys().map(|s| s.as_str()).collect()
    }

    /// Schemas for every registered action, sorted by name.
    pub fn schemas(&self) -> Vec<ActionSchema> {
        self.actions.values().map(|a| a.to_schema()).collect()
    }

    /// Prompt fragments from all actions that contribute one.
    pub fn combined_prompts(&self) -> String {
        self.actions.values()
            .map(|a| a.prompt())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Execute one invocation, absorbing every failure mode into the result.
    pub async fn dispatch(&self, invocation: &ActionInvocation, deadline: Option<Duration>) -> ActionResult {
        let Some(action) = self.get(&invocation.name) else {
            warn!("unknown action requested: {}", invocation.name);
            return ActionResult::new(
                invocation,
                ActionOutcome::failure(
                    FailureKind::UnknownAction,
                    format!("Unknown action: {}. Available: {}", invocation.name, self.list().join(", ")),
                ),
            );
        };

        debug!("dispatch: {} ({})", invocation.name, invocation.id);
        let run = AssertUnwindSafe(action.execute(invocation.arguments.clone())).catch_unwind();

        let caught = match deadline {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(caught) => caught,
                Err(_) => {
                    warn!("action {} timed out after {:?}", invocation.name, limit);
                    return ActionResult::new(
                        invocation,
                        ActionOutcome::failure(
                            FailureKind::Timeout,
                            format!("{} timed out after {}s", invocation.name, limit.as_secs()),
                        ),
                    );
                }
            },
            None => run.await,
        };

        let outcome = match caught {
            Ok(output) => {
                if let ActionOutput::Error(e) = &output {
                    warn!("action {} failed: {}", invocation.name, e);
                }
                output.into_outcome()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("action {} panicked: {}", invocation.name, message);
                ActionOutcome::failure(FailureKind::Execution, format!("{} panicked: {}", invocation.name, message))
            }
        };

        ActionResult::new(invocation, outcome)
    }

    /// Dispatch a batch strictly in declared order.
    pub async fn dispatch_all(&self, invocations: &[ActionInvocation], deadline: Option<Duration>) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            results.push(self.dispatch(invocation, deadline).await);
        }
        results
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
