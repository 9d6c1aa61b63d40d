//! LLM-backed oracle
//!
//! Renders the event log as a tool-use conversation, asks the provider for the
//! next turn, and turns the reply back into exactly one event.

use crate::provider::LlmProvider;
use crate::response::{collect_response, LlmResponse};
use crate::types::{ContentBlock, LlmContent, LlmMessage, LlmRequest, LlmTool, DEFAULT_MODEL};
use codeshift_core::{
    ActionInvocation, ActionSchema, Error, Event, Log, Oracle, Result,
};
use std::sync::Arc;
use tracing::debug;

pub struct LlmOracle {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    system_prompt: Option<String>,
}

impl LlmOracle {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 8192,
            temperature: None,
            system_prompt: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn request_for(&self, log: &Log, actions: &[ActionSchema]) -> LlmRequest {
        LlmRequest {
            model: self.model.clone(),
            messages: messages_from_log(log),
            tools: if actions.is_empty() {
                None
            } else {
                Some(actions.iter().map(LlmTool::from).collect())
            },
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
            system: self.system_prompt.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Oracle for LlmOracle {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn decide(&self, log: &Log, actions: &[ActionSchema]) -> Result<Event> {
        let request = self.request_for(log, actions);
        let stream = self.provider.complete_stream(request, None).await?;
        let response = collect_response(stream).await?;
        event_from_response(response)
    }
}

/// Map a collected completion to an event: no tool calls means the oracle is done.
pub fn event_from_response(response: LlmResponse) -> Result<Event> {
    if response.tool_calls.is_empty() {
        return Ok(Event::terminal(response.text));
    }

    let invocations = response
        .tool_calls
        .iter()
        .map(|tc| {
            let arguments = tc.parse_arguments().map_err(|e| {
                Error::malformed(format!("arguments for {} ({}): {}", tc.name, tc.id, e))
            })?;
            Ok(ActionInvocation::new(tc.id.as_str(), tc.name.as_str(), arguments))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("oracle decision: {} invocation(s)", invocations.len());
    Ok(Event::decision(response.text, invocations))
}

/// Render the log as alternating user/assistant messages. Adjacent entries that
/// map to the same role share one message.
pub fn messages_from_log(log: &Log) -> Vec<LlmMessage> {
    let mut messages: Vec<LlmMessage> = Vec::new();

    for event in log.iter() {
        let (role, content) = match event {
            Event::Human { content } => ("user", LlmContent::Text(content.clone())),
            Event::Terminal { content } => ("assistant", LlmContent::Text(content.clone())),
            Event::OracleDecision { content, invocations } => {
                let mut blocks = Vec::with_capacity(invocations.len() + 1);
                if !content.is_empty() {
                    blocks.push(ContentBlock::Text { text: content.clone() });
                }
                blocks.extend(invocations.iter().map(|inv| ContentBlock::ToolUse {
                    id: inv.id.to_string(),
                    name: inv.name.clone(),
                    input: inv.arguments.clone(),
                }));
                ("assistant", LlmContent::Blocks(blocks))
            }
            Event::ActionResult(result) => (
                "user",
                LlmContent::Blocks(vec![ContentBlock::ToolResult {
                    tool_use_id: result.invocation_id.to_string(),
                    content: result.outcome.to_content_string(),
                    is_error: result.is_failure().then_some(true),
                }]),
            ),
        };

        match messages.last_mut() {
            Some(last) if last.role == role => {
                let previous = std::mem::replace(&mut last.content, LlmContent::Blocks(Vec::new()));
                let mut blocks = previous.into_blocks();
                blocks.extend(content.into_blocks());
                last.content = LlmContent::Blocks(blocks);
            }
            _ => messages.push(LlmMessage {
                role: role.to_string(),
                content,
            }),
        }
    }

    messages
}
