//! translate: convert one source file into the target language

use super::resolve;
use crate::registry::{Action, ActionOutput};
use codeshift_core::Result;
use codeshift_llm::{collect_response, LlmMessage, LlmProvider, LlmRequest, DEFAULT_MODEL};
use regex::Regex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::fs;
use tracing::{debug, info};

/// One unit of translation work.
#[derive(Clone, Debug)]
pub struct TranslationRequest {
    pub identifier: String,
    pub source: String,
    pub source_language: String,
    pub target_language: String,
}

/// Black-box code converter. Output quality is not checked here.
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<String>;
}

/// Translator backed by a single LLM completion per file.
pub struct LlmTranslator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 8192,
            temperature: Some(0.2),
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
}

pub fn translation_prompt(request: &TranslationRequest) -> String {
    format!(
        "Convert the following {src} code to clean, runnable {dst} code.\n\
         Do not include explanations or markdown. Just give the raw {dst} code.\n\
         Source file: {id}\n\n{code}",
        src = request.source_language,
        dst = request.target_language,
        id = request.identifier,
        code = request.source,
    )
}

#[async_trait::async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String> {
        let llm_request = LlmRequest {
            model: self.model.clone(),
            messages: vec![LlmMessage::user(translation_prompt(request))],
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
            ..Default::default()
        };
        let stream = self.provider.complete_stream(llm_request, None).await?;
        let response = collect_response(stream).await?;
        Ok(clean_output(&response.text))
    }
}

fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[\w+#.-]*[ \t]*\r?\n(.*?)```").ok()).as_ref()
}

fn preamble() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(here's|here is|sure,? here's|sure,? here is|the equivalent)[^\n]*:\s*").ok()
    })
    .as_ref()
}

/// Strip markdown fences and conversational lead-ins from a model reply,
/// leaving only code.
pub fn clean_output(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(caps) = fenced_block().and_then(|re| re.captures(trimmed)) {
        if let Some(body) = caps.get(1) {
            return body.as_str().trim().to_string();
        }
    }
    let without_preamble = match preamble() {
        Some(re) => re.replace(trimmed, "").into_owned(),
        None => trimmed.to_string(),
    };
    without_preamble.trim().to_string()
}

/// Output path for a translated file: `identifier` made relative to
/// `source_root` (when it lies under it) with the extension swapped.
pub fn target_path(identifier: &str, source_root: Option<&str>, target_extension: &str) -> String {
    let id = Path::new(identifier);
    let rel = source_root
        .and_then(|root| id.strip_prefix(root).ok())
        .unwrap_or(id);
    rel.with_extension(target_extension.trim_start_matches('.'))
        .to_string_lossy()
        .to_string()
}

pub struct TranslateAction {
    workspace_root: PathBuf,
    translator: Arc<dyn Translator>,
}

impl TranslateAction {
    pub fn new(workspace_root: impl AsRef<Path>, translator: Arc<dyn Translator>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
            translator,
        }
    }
}

#[async_trait::async_trait]
impl Action for TranslateAction {
    fn name(&self) -> &str {
        "translate"
    }

    fn description(&self) -> &str {
        "Translate one source file into the target language. Pass `path` to read the file \
         from the workspace, or `source` with an `identifier`. Returns the identifier, the \
         output path relative to the source root, and the translated content. Does not write."
    }

    fn prompt(&self) -> &str {
        "After translate returns, persist its content with write_files at the returned \
         target_path under the output directory."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Workspace-relative source file" },
                "source": { "type": "string", "description": "Source code, if not reading from path" },
                "identifier": { "type": "string", "description": "Name for the unit (defaults to path)" },
                "source_root": { "type": "string", "description": "Prefix stripped when computing target_path" },
                "source_language": { "type": "string" },
                "target_language": { "type": "string" },
                "target_extension": { "type": "string", "description": "e.g. .py" }
            },
            "required": ["source_language", "target_language", "target_extension"]
        })
    }

    async fn execute(&self, args: Value) -> ActionOutput {
        let path = args["path"].as_str();
        let identifier = match args["identifier"].as_str().or(path) {
            Some(id) => id.to_string(),
            None => return ActionOutput::error("Missing required parameter: path or identifier"),
        };

        let source = match (args["source"].as_str(), path) {
            (Some(s), _) => s.to_string(),
            (None, Some(p)) => {
                let full = match resolve(&self.workspace_root, p) {
                    Ok(f) => f,
                    Err(e) => return ActionOutput::error(e),
                };
                match fs::read_to_string(full).await {
                    Ok(c) => c,
                    Err(e) => return ActionOutput::error(format!("Error reading file {}: {}", p, e)),
                }
            }
            (None, None) => return ActionOutput::error("Missing required parameter: path or source"),
        };

        let request = TranslationRequest {
            identifier: identifier.clone(),
            source,
            source_language: args["source_language"].as_str().unwrap_or("javascript").to_string(),
            target_language: args["target_language"].as_str().unwrap_or("python").to_string(),
        };
        let extension = args["target_extension"].as_str().unwrap_or(".py");

        debug!(
            "translate: {} ({} -> {})",
            identifier, request.source_language, request.target_language
        );

        let content = match self.translator.translate(&request).await {
            Ok(c) if c.trim().is_empty() => {
                return ActionOutput::error(format!("Translator returned no code for {}", identifier))
            }
            Ok(c) => c,
            Err(e) => return ActionOutput::error(format!("Conversion failed for {}: {}", identifier, e)),
        };

        let target = target_path(&identifier, args["source_root"].as_str(), extension);
        info!("translated {} -> {}", identifier, target);

        ActionOutput::Json(json!({
            "identifier": identifier,
            "target_path": target,
            "content": content,
        }))
    }
}

