//! Append-only event log
//!
//! Entries are shared behind `Arc`, so `append` returns a new log without
//! copying or touching the events already recorded.

use crate::error::{Error, Result};
use crate::event::{ActionInvocation, ActionResult, Event};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct Log {
    events: Vec<Arc<Event>>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a log from an initial instruction.
    pub fn with_prompt(content: impl Into<String>) -> Self {
        Self::new().append(Event::human(content))
    }

    /// New log with `event` at the end; `self` is left unchanged.
    pub fn append(&self, event: Event) -> Log {
        let mut events = self.events.clone();
        events.push(Arc::new(event));
        Log { events }
    }

    /// Consuming variant of `append` for a batch, used when merging deltas.
    pub fn extend(mut self, events: impl IntoIterator<Item = Event>) -> Log {
        self.events.extend(events.into_iter().map(Arc::new));
        self
    }

    pub fn latest(&self) -> Result<&Event> {
        self.last().ok_or(Error::EmptyLog)
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last().map(|e| &**e)
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index).map(|e| &**e)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|e| &**e)
    }

    /// Whether `other` starts with exactly the entries of `self`.
    pub fn is_prefix_of(&self, other: &Log) -> bool {
        self.len() <= other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }

    /// All action results, in log order.
    pub fn results(&self) -> impl Iterator<Item = &ActionResult> {
        self.iter().filter_map(Event::as_result)
    }

    /// The decision that opened the result batch ending at `index`.
    fn opening_decision(&self, index: usize) -> Option<&Event> {
        self.events[..index]
            .iter()
            .rev()
            .map(|e| &**e)
            .find(|e| e.as_result().is_none())
            .filter(|e| matches!(e, Event::OracleDecision { .. }))
    }

    /// The invocation that `result` answers, looked up in the decision directly
    /// preceding its result batch. Only the most recent batch is searched.
    pub fn paired_invocation(&self, result: &ActionResult) -> Option<&ActionInvocation> {
        let index = self
            .events
            .iter()
            .rposition(|e| e.as_result() == Some(result))?;
        self.opening_decision(index)?
            .invocations()
            .iter()
            .find(|inv| inv.id == result.invocation_id)
    }

    /// Check that every result answers an invocation of the decision right before
    /// its batch, at most once, and in declared order.
    pub fn verify_pairing(&self) -> Result<()> {
        let mut batch: Option<(&[ActionInvocation], HashSet<&str>, usize)> = None;

        for event in self.iter() {
            match event {
                Event::ActionResult(result) => {
                    let orphan = || Error::OrphanResult(result.invocation_id.to_string());
                    let (invocations, answered, cursor) = batch.as_mut().ok_or_else(orphan)?;
                    let position = invocations
                        .iter()
                        .position(|inv| inv.id == result.invocation_id)
                        .ok_or_else(orphan)?;
                    if position < *cursor || !answered.insert(result.invocation_id.as_str()) {
                        return Err(orphan());
                    }
                    *cursor = position + 1;
                }
                Event::OracleDecision { invocations, .. } => {
                    batch = Some((invocations.as_slice(), HashSet::new(), 0));
                }
                _ => batch = None,
            }
        }
        Ok(())
    }
}
