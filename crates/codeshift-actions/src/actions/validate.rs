//! verify_syntax: run a per-language syntax checker over file contents

use crate::registry::{Action, ActionOutput};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Checker commands keyed by language. Each command reads the file content on stdin
/// and exits non-zero with a diagnostic on stderr when the syntax is invalid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub timeout_secs: u64,
    pub commands: BTreeMap<String, Vec<String>>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let mut commands = BTreeMap::new();
        commands.insert(
            "python".to_string(),
            vec![
                "python3".to_string(),
                "-c".to_string(),
                "import ast, sys; ast.parse(sys.stdin.read())".to_string(),
            ],
        );
        Self {
            timeout_secs: 30,
            commands,
        }
    }
}

impl ValidationConfig {
    pub fn command_for(&self, language: &str) -> Option<&[String]> {
        self.commands
            .get(&language.to_lowercase())
            .map(Vec::as_slice)
            .filter(|c| !c.is_empty())
    }
}

pub struct VerifySyntaxAction {
    workspace_root: PathBuf,
    config: ValidationConfig,
}

impl VerifySyntaxAction {
    pub fn new(workspace_root: impl AsRef<Path>, config: ValidationConfig) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
            config,
        }
    }

    async fn check(&self, command: &[String], content: &str) -> String {
        let (program, rest) = match command.split_first() {
            Some(split) => split,
            None => return "Validator unavailable: empty command".to_string(),
        };

        let mut child = match Command::new(program)
            .args(rest)
            .current_dir(&self.workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return format!("Validator unavailable: {}", e),
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(content.as_bytes()).await {
                return format!("Validator unavailable: {}", e);
            }
        }

        let output = match tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return format!("Validator unavailable: {}", e),
            Err(_) => return format!("Validator timed out after {}s", self.config.timeout_secs),
        };

        if output.status.success() {
            "OK".to_string()
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let diagnostic = if stderr.trim().is_empty() { stdout } else { stderr };
            format!("Syntax error: {}", diagnostic.trim())
        }
    }
}

#[async_trait::async_trait]
impl Action for VerifySyntaxAction {
    fn name(&self) -> &str {
        "verify_syntax"
    }

    fn description(&self) -> &str {
        "Check the syntax of generated files. `files` maps paths to content. Returns an \
         object mapping each path to \"OK\" or a diagnostic."
    }

    fn prompt(&self) -> &str {
        "Verify converted files with verify_syntax before finishing, and fix any file \
         that reports a diagnostic."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "object",
                    "additionalProperties": { "type": "string" },
                    "description": "Map of path to file content"
                },
                "language": {
                    "type": "string",
                    "description": "Language to check, e.g. python"
                }
            },
            "required": ["files", "language"]
        })
    }

    async fn execute(&self, args: Value) -> ActionOutput {
        let files = match args["files"].as_object() {
            Some(f) => f,
            None => return ActionOutput::error("Missing required parameter: files"),
        };
        let language = match args["language"].as_str() {
            Some(l) => l,
            None => return ActionOutput::error("Missing required parameter: language"),
        };
        let Some(command) = self.config.command_for(language) else {
            return ActionOutput::error(format!("No syntax checker configured for {}", language));
        };

        let mut report = Map::new();
        for (path, content) in files {
            let verdict = match content.as_str() {
                Some(c) => self.check(command, c).await,
                None => "Syntax error: content is not a string".to_string(),
            };
            debug!("verify_syntax: {} -> {}", path, verdict.lines().next().unwrap_or(""));
            report.insert(path.clone(), Value::String(verdict));
        }

        ActionOutput::Json(Value::Object(report))
    }
}
