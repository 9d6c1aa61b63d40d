//! codeshift LLM - provider adapters with streaming support, and the LLM-backed oracle

pub mod anthropic;
pub mod oracle;
pub mod provider;
pub mod response;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use oracle::{event_from_response, messages_from_log, LlmOracle};
pub use provider::{LlmError, LlmProvider, LlmResult, LlmStream};
pub use response::{collect_response, LlmResponse};
pub use tokio_util::sync::CancellationToken;
pub use types::*;
