//! Anthropic Messages API provider with SSE streaming

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream};
use crate::types::{LlmMessage, LlmRequest, LlmTool, StreamDelta, Usage};
use futures::StreamExt;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_RETRY_AFTER_MS: u64 = 60_000;

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Request body. Messages and tools already serialize in the API's shape.
#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [LlmTool]>,
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str { "anthropic" }

    async fn complete_stream(
        &self,
        request: LlmRequest,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<LlmStream> {
        let body = MessagesBody {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens.unwrap_or(8192),
            stream: true,
            temperature: request.temperature,
            system: request.system.as_deref(),
            tools: request.tools.as_deref(),
        };

        debug!("anthropic request: model={} messages={}", body.model, body.messages.len());

        let send = self.client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send();

        let response = match &cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(LlmError::Cancelled),
                r = send => r?,
            },
            None => send.await?,
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(DEFAULT_RETRY_AFTER_MS);
            let error_text = response.text().await.unwrap_or_default();
            error!("anthropic error {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthFailed(error_text),
                429 => LlmError::RateLimited { retry_after_ms },
                _ => LlmError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        Ok(Box::pin(parse_sse_stream(response.bytes_stream(), cancel)))
    }
}

/// Locate the first blank-line frame separator: `(frame_len, separator_len)`.
fn frame_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    (0..buffer.len()).find_map(|i| {
        let rest = &buffer[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\n") || rest.starts_with(b"\r\r") {
            Some((i, 2))
        } else {
            None
        }
    })
}

/// Pop one complete `event:`/`data:` frame off the front of `buffer`.
/// Bytes are only decoded once the whole frame has arrived.
fn take_frame(buffer: &mut Vec<u8>) -> Option<(String, String)> {
    let (len, sep) = frame_boundary(buffer)?;
    let raw: Vec<u8> = buffer.drain(..len + sep).take(len).collect();
    let frame = String::from_utf8_lossy(&raw);

    let mut kind = String::new();
    let mut data: Vec<&str> = Vec::new();
    for line in frame.split(['\r', '\n']) {
        if let Some(rest) = line.strip_prefix("event:") {
            kind = rest.trim_start().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    Some((kind, data.join("\n")))
}

/// Per-stream decoding state: the open tool call and usage seen so far.
#[derive(Default)]
struct SseDecoder {
    open_tool: Option<String>,
    usage: Usage,
    stop_reason: Option<String>,
}

impl SseDecoder {
    /// Translate one frame into at most one delta. Frames that fail to parse are skipped.
    fn decode(&mut self, kind: &str, data: &str) -> Option<LlmResult<StreamDelta>> {
        match kind {
            "message_start" => {
                let start: MessageStart = serde_json::from_str(data).ok()?;
                if let Some(u) = start.message.usage {
                    self.usage.input_tokens = u.input_tokens;
                }
                None
            }
            "content_block_start" => {
                let start: ContentBlockStart = serde_json::from_str(data).ok()?;
                match start.content_block {
                    BlockKind::ToolUse { id, name } => {
                        self.open_tool = Some(id.clone());
                        Some(Ok(StreamDelta::ToolCallStart { id, name }))
                    }
                    BlockKind::Other => None,
                }
            }
            "content_block_delta" => {
                let delta: ContentBlockDelta = serde_json::from_str(data).ok()?;
                match delta.delta {
                    DeltaKind::TextDelta { text } => Some(Ok(StreamDelta::Text(text))),
                    DeltaKind::ThinkingDelta { thinking } => Some(Ok(StreamDelta::Thinking(thinking))),
                    DeltaKind::InputJsonDelta { partial_json } => {
                        self.open_tool.clone().map(|id| {
                            Ok(StreamDelta::ToolCallDelta { id, arguments: partial_json })
                        })
                    }
                    DeltaKind::Other => None,
                }
            }
            "content_block_stop" => self
                .open_tool
                .take()
                .map(|id| Ok(StreamDelta::ToolCallEnd { id })),
            "message_delta" => {
                let delta: MessageDelta = serde_json::from_str(data).ok()?;
                if let Some(u) = delta.usage {
                    self.usage.output_tokens = u.output_tokens;
                }
                if let Some(reason) = delta.delta.stop_reason {
                    debug!("message complete: stop_reason={}", reason);
                    self.stop_reason = Some(reason);
                }
                None
            }
            "message_stop" => Some(Ok(StreamDelta::Done {
                stop_reason: self.stop_reason.take().or_else(|| Some("end_turn".to_string())),
                usage: Some(self.usage.clone()),
            })),
            "error" => {
                let event: ErrorEvent = serde_json::from_str(data).ok()?;
                Some(Err(LlmError::StreamError(event.error.message)))
            }
            _ => None,
        }
    }
}

pub(crate) fn parse_sse_stream(
    bytes_stream: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    cancel: Option<CancellationToken>,
) -> impl futures::Stream<Item = LlmResult<StreamDelta>> + Send {
    let cancel = cancel.unwrap_or_default();

    async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut decoder = SseDecoder::default();

        tokio::pin!(bytes_stream);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = bytes_stream.next() => Some(next),
            };

            let chunk = match next {
                None => {
                    yield Err(LlmError::Cancelled);
                    break;
                }
                Some(None) => break,
                Some(Some(Err(e))) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    break;
                }
                Some(Some(Ok(chunk))) => chunk,
            };

            buffer.extend_from_slice(&chunk);

            while let Some((kind, data)) = take_frame(&mut buffer) {
                if data.is_empty() {
                    continue;
                }
                if let Some(item) = decoder.decode(&kind, &data) {
                    yield item;
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct MessageStart {
    message: MessageStartBody,
}

#[derive(Deserialize)]
struct MessageStartBody {
    usage: Option<InputUsage>,
}

#[derive(Deserialize)]
struct InputUsage {
    #[serde(default)]
    input_tokens: u32,
}

#[derive(Deserialize)]
struct ContentBlockStart {
    content_block: BlockKind,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockKind {
    ToolUse { id: String, name: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ContentBlockDelta {
    delta: DeltaKind,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DeltaKind {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct MessageDelta {
    delta: StopInfo,
    usage: Option<OutputUsage>,
}

#[derive(Deserialize)]
struct StopInfo {
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct OutputUsage {
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorEvent {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn sse(events: &[(&str, &str)]) -> Vec<Result<Bytes, reqwest::Error>> {
        let body: String = events
            .iter()
            .map(|(event, data)| format!("event: {}\ndata: {}\n\n", event, data))
            .collect();
        // Split mid-event to exercise buffering across chunks
        let (a, b) = body.split_at(body.len() / 2);
        vec![Ok(Bytes::from(a.to_string())), Ok(Bytes::from(b.to_string()))]
    }

    async fn collect(chunks: Vec<Result<Bytes, reqwest::Error>>, cancel: Option<CancellationToken>) -> Vec<LlmResult<StreamDelta>> {
        let stream = parse_sse_stream(futures::stream::iter(chunks), cancel);
        futures::pin_mut!(stream);
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn parses_text_and_tool_use() {
        let chunks = sse(&[
            ("message_start", r#"{"message":{"usage":{"input_tokens":12}}}"#),
            ("content_block_start", r#"{"index":0,"content_block":{"type":"text","text":""}}"#),
            ("content_block_delta", r#"{"index":0,"delta":{"type":"text_delta","text":"Cloning."}}"#),
            ("content_block_stop", r#"{"index":0}"#),
            ("content_block_start", r#"{"index":1,"content_block":{"type":"tool_use","id":"toolu_1","name":"clone_repo"}}"#),
            ("content_block_delta", r#"{"index":1,"delta":{"type":"input_json_delta","partial_json":"{\"repo_url\":"}}"#),
            ("content_block_delta", r#"{"index":1,"delta":{"type":"input_json_delta","partial_json":"\"x\"}"}}"#),
            ("content_block_stop", r#"{"index":1}"#),
            ("message_delta", r#"{"delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":40}}"#),
            ("message_stop", r#"{"type":"message_stop"}"#),
        ]);

        let deltas: Vec<StreamDelta> = collect(chunks, None)
            .await
            .into_iter()
            .map(|d| d.unwrap())
            .collect();

        assert!(matches!(&deltas[0], StreamDelta::Text(t) if t == "Cloning."));
        assert!(matches!(&deltas[1], StreamDelta::ToolCallStart { id, name } if id == "toolu_1" && name == "clone_repo"));
        let args: String = deltas
            .iter()
            .filter_map(|d| match d {
                StreamDelta::ToolCallDelta { arguments, .. } => Some(arguments.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(args, r#"{"repo_url":"x"}"#);
        assert!(deltas.iter().any(|d| matches!(d, StreamDelta::ToolCallEnd { id } if id == "toolu_1")));
        match deltas.last().unwrap() {
            StreamDelta::Done { stop_reason, usage } => {
                assert_eq!(stop_reason.as_deref(), Some("tool_use"));
                let usage = usage.as_ref().unwrap();
                assert_eq!(usage.input_tokens, 12);
                assert_eq!(usage.output_tokens, 40);
            }
            other => panic!("Expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn multibyte_text_split_across_chunks_survives() {
        let body = "event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"caf\u{e9} d\u{e9}j\u{e0}\"}}\n\n";
        let bytes = body.as_bytes();
        // Cut between the two bytes of the first 'é'
        let cut = body.find('\u{e9}').unwrap() + 1;
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&bytes[..cut])),
            Ok(Bytes::copy_from_slice(&bytes[cut..])),
        ];

        let items = collect(chunks, None).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Ok(StreamDelta::Text(t)) if t == "caf\u{e9} d\u{e9}j\u{e0}"));
    }

    #[tokio::test]
    async fn crlf_framed_events_are_decoded() {
        let body = concat!(
            "event: content_block_delta\r\n",
            "data: {\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"one\"}}\r\n\r\n",
            "event: content_block_delta\r\n",
            "data: {\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"two\"}}\r\n\r\n",
        );
        let items = collect(vec![Ok(Bytes::from(body))], None).await;
        let texts: Vec<String> = items
            .into_iter()
            .map(|d| match d.unwrap() {
                StreamDelta::Text(t) => t,
                other => panic!("Expected Text, got {:?}", other),
            })
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn take_frame_waits_for_complete_frame() {
        let mut buffer = b"event: ping\ndata: {}\n".to_vec();
        assert!(take_frame(&mut buffer).is_none());
        buffer.extend_from_slice(b"\nevent: next");
        let (kind, data) = take_frame(&mut buffer).unwrap();
        assert_eq!(kind, "ping");
        assert_eq!(data, "{}");
        assert_eq!(buffer, b"event: next");
    }

    #[tokio::test]
    async fn error_event_becomes_stream_error() {
        let chunks = sse(&[("error", r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)]);
        let items = collect(chunks, None).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(LlmError::StreamError(m)) if m == "Overloaded"));
    }

    #[tokio::test]
    async fn cancelled_token_stops_stream() {
        let token = CancellationToken::new();
        token.cancel();
        let chunks = sse(&[("content_block_delta", r#"{"index":0,"delta":{"type":"text_delta","text":"hi"}}"#)]);
        let items = collect(chunks, Some(token)).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(LlmError::Cancelled)));
    }
}
