//! write_files: batch write under a base directory

use super::resolve;
use crate::registry::{Action, ActionOutput};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub struct WriteFilesAction {
    workspace_root: PathBuf,
}

impl WriteFilesAction {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl Action for WriteFilesAction {
    fn name(&self) -> &str {
        "write_files"
    }

    fn description(&self) -> &str {
        "Write several files at once. `files` maps paths relative to `base_path` to their \
         content. Creates parent directories and overwrites existing files."
    }

    fn prompt(&self) -> &str {
        "Write converted files with write_files, keeping each file's path relative to the \
         source root so the output mirrors the original layout."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "object",
                    "additionalProperties": { "type": "string" },
                    "description": "Map of relative path to file content"
                },
                "base_path": {
                    "type": "string",
                    "description": "Workspace-relative directory the paths are relative to"
                }
            },
            "required": ["files", "base_path"]
        })
    }

    async fn execute(&self, args: Value) -> ActionOutput {
        let files = match args["files"].as_object() {
            Some(f) => f,
            None => return ActionOutput::error("Missing required parameter: files"),
        };
        let base_path = args["base_path"].as_str().unwrap_or(".");

        // A bad entry fails the batch before anything is written.
        let mut targets = Vec::with_capacity(files.len());
        for (rel_path, content) in files {
            let Some(content) = content.as_str() else {
                return ActionOutput::error(format!("Content for {} must be a string", rel_path));
            };
            let joined = Path::new(base_path).join(rel_path.trim_start_matches('/'));
            match resolve(&self.workspace_root, joined) {
                Ok(full_path) => targets.push((rel_path, full_path, content)),
                Err(e) => return ActionOutput::error(e),
            }
        }

        for (rel_path, full_path, content) in targets {
            if let Some(parent) = full_path.parent() {
                if let Err(e) = fs::create_dir_all(parent).await {
                    return ActionOutput::error(format!("Failed to create directories for {}: {}", rel_path, e));
                }
            }
            if let Err(e) = fs::write(&full_path, content).await {
                return ActionOutput::error(format!("Failed to write {}: {}", rel_path, e));
            }
            debug!("write_files: {} ({} bytes)", rel_path, content.len());
        }

        ActionOutput::text(format!("Successfully wrote {} files to {}", files.len(), base_path))
    }
}
