//! Wire-level shapes shared by providers and the oracle
//!
//! Messages, content blocks and tool definitions serialize exactly as the
//! Messages API expects, so providers can put them on the wire as-is.

use codeshift_core::ActionSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// One completion request.
#[derive(Clone, Debug, Serialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<LlmMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<LlmTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl Default for LlmRequest {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            messages: Vec::new(),
            tools: None,
            max_tokens: Some(8192),
            temperature: None,
            system: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: LlmContent,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: "user".into(), content: LlmContent::Text(text.into()) }
    }
}

/// A bare string, or a list of typed blocks.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LlmContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl LlmContent {
    /// Block form of this content. Empty text yields no blocks.
    pub fn into_blocks(self) -> Vec<ContentBlock> {
        match self {
            LlmContent::Text(text) if text.is_empty() => Vec::new(),
            LlmContent::Text(text) => vec![ContentBlock::Text { text }],
            LlmContent::Blocks(blocks) => blocks,
        }
    }
}

impl From<String> for LlmContent {
    fn from(text: String) -> Self {
        LlmContent::Text(text)
    }
}

impl From<&str> for LlmContent {
    fn from(text: &str) -> Self {
        LlmContent::Text(text.to_owned())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// An action as the model sees it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<&ActionSchema> for LlmTool {
    fn from(schema: &ActionSchema) -> Self {
        Self {
            name: schema.name.clone(),
            description: schema.description.clone(),
            input_schema: schema.input_schema.clone(),
        }
    }
}

/// Incremental piece of a streamed completion.
#[derive(Clone, Debug)]
pub enum StreamDelta {
    Text(String),
    Thinking(String),
    ToolCallStart { id: String, name: String },
    ToolCallDelta { id: String, arguments: String },
    ToolCallEnd { id: String },
    Done { stop_reason: Option<String>, usage: Option<Usage> },
    Error(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A tool call reassembled from its streamed fragments.
#[derive(Clone, Debug, Default)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw argument JSON as concatenated from the stream.
    pub arguments: String,
}

impl ToolCall {
    /// Decode the arguments. A call that streamed nothing takes `{}`.
    pub fn parse_arguments(&self) -> Result<Value, serde_json::Error> {
        match self.arguments.trim() {
            "" => Ok(Value::Object(Default::default())),
            raw => serde_json::from_str(raw),
        }
    }
}
