//! read_files: batch read, tolerating per-file failures

use super::resolve;
use crate::registry::{Action, ActionOutput};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub struct ReadFilesAction {
    workspace_root: PathBuf,
}

impl ReadFilesAction {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl Action for ReadFilesAction {
    fn name(&self) -> &str {
        "read_files"
    }

    fn description(&self) -> &str {
        "Read several files at once. Returns an object mapping each path to its content, \
         or to an error message for files that could not be read."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_paths": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Workspace-relative paths to read"
                }
            },
            "required": ["file_paths"]
        })
    }

    async fn execute(&self, args: Value) -> ActionOutput {
        let paths = match args["file_paths"].as_array() {
            Some(p) => p,
            None => return ActionOutput::error("Missing required parameter: file_paths"),
        };

        let mut contents = Map::new();
        for entry in paths {
            let Some(path) = entry.as_str() else {
                return ActionOutput::error(format!("file_paths entries must be strings, got {}", entry));
            };
            let text = match resolve(&self.workspace_root, path) {
                Ok(full) => match fs::read_to_string(full).await {
                    Ok(c) => c,
                    Err(e) => format!("Error reading file: {}", e),
                },
                Err(e) => format!("Error reading file: {}", e),
            };
            contents.insert(path.to_string(), Value::String(text));
        }

        debug!("read_files: {} files", contents.len());
        ActionOutput::Json(Value::Object(contents))
    }
}
