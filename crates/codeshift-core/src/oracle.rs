//! The oracle boundary: whatever decides the next actions from the history

use crate::error::Result;
use crate::event::Event;
use crate::log::Log;
use crate::types::ActionSchema;

/// A pluggable decision maker.
///
/// Given the full log and the declared actions, return exactly one event: a
/// terminal event, or a decision carrying one or more invocations. Transport,
/// auth, and timeout failures map to `Error::OracleUnavailable`. Implementations
/// must not retry internally; the executor owns the retry policy.
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    async fn decide(&self, log: &Log, actions: &[ActionSchema]) -> Result<Event>;
}
