pub mod clone;
pub mod list;
pub mod read;
pub mod translate;
pub mod validate;
pub mod write;

use std::path::{Component, Path, PathBuf};

/// Resolve an argument path inside the workspace root. Absolute paths and
/// paths whose `..` components climb above the root are refused.
pub(crate) fn resolve(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, String> {
    let path = path.as_ref();
    let mut rel = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !rel.pop() {
                    return Err(format!("Path escapes the workspace: {}", path.display()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!(
                    "Path must be relative to the workspace: {}",
                    path.display()
                ));
            }
        }
    }
    Ok(root.join(rel))
}
