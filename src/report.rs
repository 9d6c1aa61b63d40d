//! Human-readable run summary

use codeshift_core::Event;
use codeshift_engine::{RunOutcome, RunStatus};
use std::collections::BTreeMap;
use std::fmt::Write;

pub fn summary(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    let status = match &outcome.status {
        RunStatus::Completed => "completed".to_string(),
        RunStatus::IterationLimitExceeded { cap } => format!("incomplete (iteration cap of {} reached)", cap),
        RunStatus::Cancelled => "cancelled".to_string(),
    };
    let _ = writeln!(out, "Run {} after {} steps ({} events)", status, outcome.iterations, outcome.state.log.len());

    let mut per_action: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for result in outcome.state.log.results() {
        let entry = per_action.entry(result.name.as_str()).or_default();
        entry.0 += 1;
        if result.is_failure() {
            entry.1 += 1;
        }
    }
    for (name, (calls, failures)) in &per_action {
        let _ = writeln!(out, "  {:<14} {:>3} call(s), {} failed", name, calls, failures);
    }

    if let Some(Event::Terminal { content }) = outcome.state.log.last() {
        if !content.trim().is_empty() {
            let _ = writeln!(out, "\n{}", content.trim());
        }
    }
    out
}
