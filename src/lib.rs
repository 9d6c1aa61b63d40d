//! codeshift - LLM-driven repository conversion
//!
//! Wires configuration, the LLM oracle, and the builtin actions into an executor.

pub mod config;
pub mod prompt;
pub mod report;

pub use config::{CodeshiftConfig, OracleConfig, TranslatorConfig};

use codeshift_actions::{create_default_registry, LlmTranslator};
use codeshift_core::State;
use codeshift_engine::Executor;
use codeshift_llm::{LlmOracle, LlmProvider};
use std::path::Path;
use std::sync::Arc;

/// Build an executor whose oracle and translator both talk to `provider`, with
/// every action rooted at `workspace`.
pub fn build_executor(config: &CodeshiftConfig, workspace: &Path, provider: Arc<dyn LlmProvider>) -> Executor {
    let translator = LlmTranslator::new(provider.clone())
        .with_model(config.translator_model())
        .with_max_tokens(config.translator.max_tokens)
        .with_temperature(config.translator.temperature);

    let registry = create_default_registry(workspace, Arc::new(translator), config.validation.clone());
    let system = prompt::system_prompt(config.oracle.system_prompt.as_deref(), &registry.combined_prompts());

    let oracle = LlmOracle::new(provider)
        .with_model(config.oracle.model.clone())
        .with_max_tokens(config.oracle.max_tokens)
        .with_temperature(config.oracle.temperature)
        .with_system_prompt(Some(system));

    Executor::new(Arc::new(oracle), Arc::new(registry), config.executor.clone())
}

/// Fresh state for a run: the configured run parameters and the opening instruction.
pub fn initial_state(config: &CodeshiftConfig) -> State {
    State::new(config.run.clone(), prompt::initial_prompt(&config.run))
}
