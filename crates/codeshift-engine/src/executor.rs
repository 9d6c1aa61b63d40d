//! Graph executor - route, run one node, merge, repeat
//!
//! One node runs at a time. Every node execution, including oracle retries,
//! counts toward `max_iterations`.

use crate::backoff::RetryPolicy;
use crate::queue::{discovery_step, next_item_step};
use crate::router::{follow_up_step, route, Route};
use codeshift_actions::ActionRegistry;
use codeshift_core::{Error, Event, Oracle, Result, State, StateDelta};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub max_iterations: usize,
    /// Deadline per oracle call. 0 disables it.
    pub oracle_timeout_secs: u64,
    /// Deadline per action. 0 disables it.
    pub action_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            oracle_timeout_secs: 300,
            action_timeout_secs: 600,
            retry: RetryPolicy::default(),
        }
    }
}

fn deadline(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    IterationLimitExceeded { cap: usize },
    Cancelled,
}

/// Final state of a run plus how it ended. Incomplete runs keep their partial state.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub state: State,
    pub status: RunStatus,
    pub iterations: usize,
    pub trace: Vec<Route>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn into_result(self) -> Result<State> {
        match self.status {
            RunStatus::Completed => Ok(self.state),
            RunStatus::IterationLimitExceeded { cap } => Err(Error::IterationLimitExceeded { cap }),
            RunStatus::Cancelled => Err(Error::Cancelled),
        }
    }
}

pub struct Executor {
    oracle: Arc<dyn Oracle>,
    actions: Arc<ActionRegistry>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(oracle: Arc<dyn Oracle>, actions: Arc<ActionRegistry>, config: ExecutorConfig) -> Self {
        Self { oracle, actions, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn actions(&self) -> &Arc<ActionRegistry> {
        &self.actions
    }

    pub async fn run(&self, state: State) -> Result<RunOutcome> {
        self.run_cancellable(state, CancellationToken::new()).await
    }

    /// Drive `state` until the router says Terminal, the cap is hit, or `cancel` fires.
    /// Oracle failures that outlive the retry policy end the run with an error.
    pub async fn run_cancellable(&self, mut state: State, cancel: CancellationToken) -> Result<RunOutcome> {
        if state.log.is_empty() {
            return Err(Error::EmptyLog);
        }

        let cap = self.config.max_iterations;
        let mut iterations = 0;
        let mut trace = Vec::new();
        let mut oracle_failures = 0u32;

        info!(
            "run started: oracle={}, {} actions, cap {}",
            self.oracle.name(),
            self.actions.list().len(),
            cap
        );

        let status = loop {
            if cancel.is_cancelled() {
                info!("run cancelled after {} steps", iterations);
                break RunStatus::Cancelled;
            }

            let next = route(&state);
            if next == Route::Terminal {
                break RunStatus::Completed;
            }
            if iterations >= cap {
                warn!("iteration cap of {} reached", cap);
                break RunStatus::IterationLimitExceeded { cap };
            }

            iterations += 1;
            trace.push(next);
            debug!("step {}: {}", iterations, next);

            let stepped = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = self.step(next, &state) => Some(r),
            };
            let Some(stepped) = stepped else {
                info!("run cancelled during {}", next);
                break RunStatus::Cancelled;
            };

            match stepped {
                Ok(delta) => {
                    if next == Route::Oracle {
                        oracle_failures = 0;
                    }
                    state = state.merge(delta);
                    debug_assert!(
                        state.log.verify_pairing().is_ok(),
                        "pairing broken after {}",
                        next
                    );
                }
                Err(e) if self.config.retry.should_retry(oracle_failures, &e) => {
                    let delay = self.config.retry.delay_for(oracle_failures);
                    oracle_failures += 1;
                    warn!(
                        "oracle attempt failed ({}), retry {}/{} in {:?}",
                        e, oracle_failures, self.config.retry.max_retries, delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    warn!("run failed after {} steps: {}", iterations, e);
                    return Err(e);
                }
            }
        };

        info!("run finished: {:?} after {} steps, {} events", status, iterations, state.log.len());
        Ok(RunOutcome {
            state,
            status,
            iterations,
            trace,
        })
    }

    /// Execute one node against `state` and return its delta.
    pub async fn step(&self, next: Route, state: &State) -> Result<StateDelta> {
        match next {
            Route::Dispatch => Ok(self.dispatch(state).await),
            Route::ProcessDiscovery => Ok(discovery_step(state)),
            Route::NextItem => Ok(next_item_step(state)),
            Route::Oracle => self.consult_oracle(state).await.map(StateDelta::event),
            Route::FollowUp => Ok(follow_up_step(state)),
            Route::Terminal => Ok(StateDelta::empty()),
        }
    }

    async fn consult_oracle(&self, state: &State) -> Result<Event> {
        let schemas = self.actions.schemas();
        let decision = self.oracle.decide(&state.log, &schemas);

        let event = match deadline(self.config.oracle_timeout_secs) {
            Some(limit) => tokio::time::timeout(limit, decision).await.map_err(|_| {
                Error::oracle_unavailable(format!("no decision within {}s", limit.as_secs()))
            })??,
            None => decision.await?,
        };

        let event = event.validate_oracle_output()?;
        debug!("oracle produced {:?} with {} invocation(s)", event.role(), event.invocations().len());
        Ok(event)
    }

    async fn dispatch(&self, state: &State) -> StateDelta {
        let invocations = match state.log.last() {
            Some(event) => event.invocations(),
            None => return StateDelta::empty(),
        };
        let results = self
            .actions
            .dispatch_all(invocations, deadline(self.config.action_timeout_secs))
            .await;
        StateDelta::events(results.into_iter().map(Event::result).collect())
    }
}
