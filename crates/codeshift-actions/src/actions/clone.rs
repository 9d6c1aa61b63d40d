//! clone_repo: fetch a git repository into the workspace

use super::resolve;
use crate::registry::{Action, ActionOutput};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

pub struct CloneRepoAction {
    workspace_root: PathBuf,
    timeout_secs: u64,
}

impl CloneRepoAction {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
            timeout_secs: 300,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[async_trait::async_trait]
impl Action for CloneRepoAction {
    fn name(&self) -> &str {
        "clone_repo"
    }

    fn description(&self) -> &str {
        "Clone a git repository into a local directory. An existing directory at the \
         destination is removed first."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo_url": {
                    "type": "string",
                    "description": "URL of the repository to clone"
                },
                "local_path": {
                    "type": "string",
                    "description": "Workspace-relative destination directory"
                }
            },
            "required": ["repo_url", "local_path"]
        })
    }

    async fn execute(&self, args: Value) -> ActionOutput {
        let url = match args["repo_url"].as_str() {
            Some(u) if !u.trim().is_empty() => u,
            _ => return ActionOutput::error("Missing required parameter: repo_url"),
        };
        let local_path = match args["local_path"].as_str() {
            Some(p) => p,
            None => return ActionOutput::error("Missing required parameter: local_path"),
        };

        let dest = match resolve(&self.workspace_root, local_path) {
            Ok(d) if d != self.workspace_root => d,
            Ok(_) => return ActionOutput::error("local_path must name a directory inside the workspace"),
            Err(e) => return ActionOutput::error(e),
        };
        if fs::metadata(&dest).await.is_ok() {
            debug!("clone_repo: removing existing {}", dest.display());
            if let Err(e) = fs::remove_dir_all(&dest).await {
                return ActionOutput::error(format!("Failed to clear {}: {}", local_path, e));
            }
        }
        if let Some(parent) = dest.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return ActionOutput::error(format!("Failed to create directories: {}", e));
            }
        }

        let output = match tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new("git")
                .arg("clone")
                .arg("--quiet")
                .arg(url)
                .arg(&dest)
                .current_dir(&self.workspace_root)
                .kill_on_drop(true)
                .output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return ActionOutput::error(format!("Failed to run git: {}", e)),
            Err(_) => {
                return ActionOutput::error(format!("git clone timed out after {}s", self.timeout_secs))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return ActionOutput::error(format!(
                "Git clone failed (exit code {}): {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ));
        }

        info!("cloned {} into {}", url, local_path);
        ActionOutput::Json(json!({
            "success": true,
            "message": format!("Cloned repository from {} to {}.", url, local_path),
        }))
    }
}
