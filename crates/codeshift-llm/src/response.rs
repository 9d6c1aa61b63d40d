//! Folding a delta stream into one complete response

use crate::provider::{LlmError, LlmResult, LlmStream};
use crate::types::{ToolCall, StreamDelta, Usage};
use futures::StreamExt;
use tracing::debug;

/// Everything one completion produced.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: Option<String>,
    pub usage: Option<Usage>,
}

/// Drain `stream`, accumulating text and tool calls in arrival order.
/// The first error item aborts collection.
pub async fn collect_response(mut stream: LlmStream) -> LlmResult<LlmResponse> {
    let mut response = LlmResponse::default();
    let mut current_tool: Option<ToolCall> = None;

    while let Some(delta) = stream.next().await {
        match delta? {
            StreamDelta::Text(text) => response.text.push_str(&text),
            StreamDelta::Thinking(_) => {}
            StreamDelta::ToolCallStart { id, name } => {
                if let Some(tool) = current_tool.take() {
                    response.tool_calls.push(tool);
                }
                current_tool = Some(ToolCall { id, name, arguments: String::new() });
            }
            StreamDelta::ToolCallDelta { arguments, .. } => {
                if let Some(ref mut tool) = current_tool {
                    tool.arguments.push_str(&arguments);
                }
            }
            StreamDelta::ToolCallEnd { .. } => {
                if let Some(tool) = current_tool.take() {
                    response.tool_calls.push(tool);
                }
            }
            StreamDelta::Done { stop_reason, usage } => {
                response.stop_reason = stop_reason;
                response.usage = usage;
            }
            StreamDelta::Error(e) => return Err(LlmError::StreamError(e)),
        }
    }

    if let Some(tool) = current_tool.take() {
        response.tool_calls.push(tool);
    }

    debug!(
        "collected response: {} chars, {} tool calls",
        response.text.len(),
        response.tool_calls.len()
    );
    Ok(response)
}
