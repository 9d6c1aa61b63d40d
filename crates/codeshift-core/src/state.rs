//! Run state, deltas, and the merge policy between them

use crate::error::{Error, Result};
use crate::event::Event;
use crate::log::Log;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// FIFO of pending work-item identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkQueue(VecDeque<String>);

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Split off the head item, returning it with the remaining queue.
    pub fn pop(&self) -> Option<(String, WorkQueue)> {
        let mut rest = self.0.clone();
        let head = rest.pop_front()?;
        Some((head, WorkQueue(rest)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for WorkQueue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Which actions drive the work queue, and how queued items are filtered and invoked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Action whose result is parsed into the work queue. `None` disables queueing.
    pub discovery_action: Option<String>,
    /// Action invoked once per queued item.
    pub per_item_action: String,
    /// Case-sensitive suffix a discovered path must end with.
    pub item_suffix: Option<String>,
    /// Glob a discovered path must match. Checked in addition to the suffix.
    pub item_glob: Option<String>,
    /// Argument name the item identifier is passed under.
    pub item_argument: String,
    /// Extra arguments merged into every per-item invocation.
    pub item_arguments: Map<String, Value>,
    /// Human prompts handed back to the oracle, one per `Terminal`, before the
    /// run is allowed to finish (planning, final review).
    pub follow_ups: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            discovery_action: Some("list_files".into()),
            per_item_action: "translate".into(),
            item_suffix: Some(".js".into()),
            item_glob: None,
            item_argument: "path".into(),
            item_arguments: Map::new(),
            follow_ups: Vec::new(),
        }
    }
}

impl WorkflowConfig {
    pub fn is_discovery(&self, action: &str) -> bool {
        self.discovery_action.as_deref() == Some(action)
    }

    pub fn is_per_item(&self, action: &str) -> bool {
        self.per_item_action == action
    }
}

/// Per-run configuration: where the source comes from, where work happens, what to produce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub source_url: String,
    /// Clone destination, relative to the workspace.
    pub repo_path: String,
    /// Output directory, relative to the workspace.
    pub output_path: String,
    pub source_language: String,
    pub target_language: String,
    pub target_extension: String,
    pub workflow: WorkflowConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            repo_path: "cloned".into(),
            output_path: "converted".into(),
            source_language: "javascript".into(),
            target_language: "python".into(),
            target_extension: ".py".into(),
            workflow: WorkflowConfig::default(),
        }
    }
}

/// Single source of truth threaded through every step of a run.
#[derive(Clone, Debug, Default)]
pub struct State {
    pub log: Log,
    pub queue: WorkQueue,
    pub config: RunConfig,
}

impl State {
    pub fn new(config: RunConfig, prompt: impl Into<String>) -> Self {
        Self {
            log: Log::with_prompt(prompt),
            queue: WorkQueue::new(),
            config,
        }
    }

    pub fn latest(&self) -> Result<&Event> {
        self.log.latest()
    }

    /// Apply a delta: log appends, queue replaces, config replaces if present.
    pub fn merge(self, delta: StateDelta) -> State {
        State {
            log: self.log.extend(delta.events),
            queue: delta.queue.unwrap_or(self.queue),
            config: delta.config.unwrap_or(self.config),
        }
    }

    pub fn verify(&self) -> Result<()> {
        if self.log.is_empty() {
            return Err(Error::EmptyLog);
        }
        self.log.verify_pairing()
    }
}

/// Partial update returned by one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateDelta {
    pub events: Vec<Event>,
    pub queue: Option<WorkQueue>,
    pub config: Option<RunConfig>,
}

impl StateDelta {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn event(event: Event) -> Self {
        Self {
            events: vec![event],
            ..Self::default()
        }
    }

    pub fn events(events: Vec<Event>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_queue(mut self, queue: WorkQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.queue.is_none() && self.config.is_none()
    }

    /// Combine with a later delta. Events concatenate; for queue and config the later
    /// delta wins when it sets the field.
    pub fn then(mut self, later: StateDelta) -> StateDelta {
        self.events.extend(later.events);
        StateDelta {
            events: self.events,
            queue: later.queue.or(self.queue),
            config: later.config.or(self.config),
        }
    }
}
