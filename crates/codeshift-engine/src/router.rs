//! Router - picks the next node from the current state

use codeshift_core::{Event, State, StateDelta};
use tracing::info;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Execute the invocations of the latest decision.
    Dispatch,
    /// Turn the latest discovery result into the work queue.
    ProcessDiscovery,
    /// Pop the queue head into a synthesized decision.
    NextItem,
    /// Ask the oracle for the next event.
    Oracle,
    /// Reopen a finished conversation with the next configured follow-up prompt.
    FollowUp,
    Terminal,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::Dispatch => "dispatch",
            Route::ProcessDiscovery => "process_discovery",
            Route::NextItem => "next_item",
            Route::Oracle => "oracle",
            Route::FollowUp => "follow_up",
            Route::Terminal => "terminal",
        };
        f.write_str(s)
    }
}

/// First matching rule wins:
/// 1. discovery result -> ProcessDiscovery
/// 2. per-item result with work left -> NextItem
/// 3. undispatched invocations -> Dispatch
/// 4. work left -> NextItem
/// 5. terminal with a follow-up still due -> FollowUp
/// 6. terminal or empty log -> Terminal, anything else -> Oracle
pub fn route(state: &State) -> Route {
    let Some(last) = state.log.last() else {
        return Route::Terminal;
    };
    let workflow = &state.config.workflow;

    if let Some(result) = last.as_result() {
        let action = state
            .log
            .paired_invocation(result)
            .map(|inv| inv.name.as_str());
        if let Some(name) = action {
            if workflow.is_discovery(name) {
                return Route::ProcessDiscovery;
            }
            if workflow.is_per_item(name) && !state.queue.is_empty() {
                return Route::NextItem;
            }
        }
    }

    if !last.invocations().is_empty() {
        return Route::Dispatch;
    }

    if !state.queue.is_empty() {
        return Route::NextItem;
    }

    match last {
        Event::Terminal { .. } if pending_follow_up(state).is_some() => Route::FollowUp,
        Event::Terminal { .. } => Route::Terminal,
        _ => Route::Oracle,
    }
}

/// The follow-up prompt owed after the latest `Terminal`: the n-th terminal
/// in the log is answered by the n-th configured prompt.
pub fn pending_follow_up(state: &State) -> Option<&str> {
    let finished = state.log.iter().filter(|e| e.is_terminal()).count();
    finished
        .checked_sub(1)
        .and_then(|i| state.config.workflow.follow_ups.get(i))
        .map(String::as_str)
}

/// Append the due follow-up prompt as human input.
pub fn follow_up_step(state: &State) -> StateDelta {
    match pending_follow_up(state) {
        Some(prompt) => {
            info!("oracle finished; sending follow-up prompt");
            StateDelta::event(Event::human(prompt))
        }
        None => StateDelta::empty(),
    }
}
