//! list_files: recursive enumeration of a directory

use super::resolve;
use crate::registry::{Action, ActionOutput};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub struct ListFilesAction {
    workspace_root: PathBuf,
}

impl ListFilesAction {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl Action for ListFilesAction {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List all files under a directory, recursively. Returns a sorted JSON array of \
         paths prefixed with the given directory. Hidden entries such as .git are skipped."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory_path": {
                    "type": "string",
                    "description": "Workspace-relative directory to list"
                }
            },
            "required": ["directory_path"]
        })
    }

    async fn execute(&self, args: Value) -> ActionOutput {
        let dir = match args["directory_path"].as_str() {
            Some(d) => d,
            None => return ActionOutput::error("Missing required parameter: directory_path"),
        };

        let root = match resolve(&self.workspace_root, dir) {
            Ok(r) => r,
            Err(e) => return ActionOutput::error(e),
        };
        if !root.is_dir() {
            debug!("list_files: {} does not exist", dir);
            return ActionOutput::Json(json!([]));
        }

        let mut files: Vec<String> = WalkDir::new(&root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&root).ok()?;
                Some(Path::new(dir).join(rel).to_string_lossy().to_string())
            })
            .collect();
        files.sort();

        debug!("list_files: {} -> {} files", dir, files.len());
        ActionOutput::Json(json!(files))
    }
}
