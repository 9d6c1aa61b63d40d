//! Queue manager - discovery results in, one per-item decision out at a time

use codeshift_core::{
    ActionInvocation, ActionOutcome, Error, Event, Result, RunConfig, State, StateDelta,
    WorkQueue, WorkflowConfig,
};
use globset::{Glob, GlobMatcher};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Which discovered paths become work items. Both checks apply when both are set.
#[derive(Clone, Debug, Default)]
pub struct ItemFilter {
    suffix: Option<String>,
    glob: Option<GlobMatcher>,
}

impl ItemFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: Some(suffix.into()),
            glob: None,
        }
    }

    pub fn glob(pattern: &str) -> Result<Self> {
        let matcher = Glob::new(pattern)
            .map_err(|e| Error::Config(format!("invalid item glob {:?}: {}", pattern, e)))?
            .compile_matcher();
        Ok(Self {
            suffix: None,
            glob: Some(matcher),
        })
    }

    pub fn from_workflow(workflow: &WorkflowConfig) -> Result<Self> {
        let mut filter = match workflow.item_glob.as_deref() {
            Some(pattern) => Self::glob(pattern)?,
            None => Self::any(),
        };
        filter.suffix = workflow.item_suffix.clone().filter(|s| !s.is_empty());
        Ok(filter)
    }

    /// Case-sensitive.
    pub fn matches(&self, item: &str) -> bool {
        let suffix_ok = self.suffix.as_deref().map_or(true, |s| item.ends_with(s));
        let glob_ok = self.glob.as_ref().map_or(true, |g| g.is_match(item));
        suffix_ok && glob_ok
    }
}

/// Parse a raw listing (a JSON array of paths, or a string holding one) and keep
/// the items the filter accepts, in their original order.
pub fn process_discovery(raw: &Value, filter: &ItemFilter) -> Result<WorkQueue> {
    let parsed;
    let listing = match raw {
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s)
                .map_err(|e| Error::Parse(format!("discovery output is not JSON: {}", e)))?;
            &parsed
        }
        other => other,
    };

    let items = listing
        .as_array()
        .ok_or_else(|| Error::Parse("discovery output is not an array".into()))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::Parse(format!("non-string item in listing: {}", item)))
        })
        .filter(|item| item.as_ref().map_or(true, |s| filter.matches(s)))
        .collect()
}

/// Pop the head item into a decision invoking the per-item action.
/// `None` when the queue is empty.
pub fn next_item(queue: &WorkQueue, config: &RunConfig) -> Option<(Event, WorkQueue)> {
    let (item, rest) = queue.pop()?;
    let workflow = &config.workflow;

    let mut args = Map::new();
    args.insert(workflow.item_argument.clone(), Value::String(item.clone()));
    args.insert("source_root".into(), Value::String(config.repo_path.clone()));
    args.insert("source_language".into(), Value::String(config.source_language.clone()));
    args.insert("target_language".into(), Value::String(config.target_language.clone()));
    args.insert("target_extension".into(), Value::String(config.target_extension.clone()));
    for (key, value) in &workflow.item_arguments {
        args.entry(key.clone()).or_insert_with(|| value.clone());
    }

    let invocation = ActionInvocation::generated(workflow.per_item_action.clone(), Value::Object(args));
    let event = Event::decision(format!("Next work item: {}", item), vec![invocation]);
    Some((event, rest))
}

/// ProcessDiscovery node. Failures empty the queue and leave a notice in the log.
pub fn discovery_step(state: &State) -> StateDelta {
    let result = match state.log.last().and_then(Event::as_result) {
        Some(r) => r,
        None => return StateDelta::empty(),
    };

    let queued = match &result.outcome {
        ActionOutcome::Failure { message, .. } => {
            Err(Error::Parse(format!("discovery action {} failed: {}", result.name, message)))
        }
        ActionOutcome::Success { output } => ItemFilter::from_workflow(&state.config.workflow)
            .and_then(|filter| process_discovery(output, &filter)),
    };

    match queued {
        Ok(queue) => {
            info!("discovery queued {} item(s)", queue.len());
            let notice = discovery_notice(&queue, &state.config.workflow);
            StateDelta::event(Event::human(notice)).with_queue(queue)
        }
        Err(e) => {
            warn!("discovery failed, queue emptied: {}", e);
            StateDelta::event(Event::human(format!("Discovery failed: {}. No items were queued.", e)))
                .with_queue(WorkQueue::new())
        }
    }
}

/// NextItem node. No-op on an empty queue.
pub fn next_item_step(state: &State) -> StateDelta {
    match next_item(&state.queue, &state.config) {
        Some((event, rest)) => {
            debug!("next item, {} remaining", rest.len());
            StateDelta::event(event).with_queue(rest)
        }
        None => StateDelta::empty(),
    }
}

fn discovery_notice(queue: &WorkQueue, workflow: &WorkflowConfig) -> String {
    if queue.is_empty() {
        return "Discovery found no matching items; nothing was queued.".to_string();
    }
    let items: Vec<&str> = queue.iter().collect();
    format!(
        "Queued {} item(s) for {}: {}",
        queue.len(),
        workflow.per_item_action,
        items.join(", ")
    )
}
