//! codeshift engine - routing, work queue, and the executor loop

pub mod backoff;
pub mod executor;
pub mod queue;
pub mod router;

pub use backoff::RetryPolicy;
pub use executor::{Executor, ExecutorConfig, RunOutcome, RunStatus};
pub use queue::{discovery_step, next_item, next_item_step, process_discovery, ItemFilter};
pub use router::{follow_up_step, pending_follow_up, route, Route};
