//! codeshift actions - the side-effecting operations the oracle can request
//!
//! Each action is a self-contained file in src/actions/.
//! To add an action: create the file, implement the Action trait, register below.

pub mod actions;
pub mod registry;

pub use actions::clone::CloneRepoAction;
pub use actions::list::ListFilesAction;
pub use actions::read::ReadFilesAction;
pub use actions::translate::{
    clean_output, target_path, translation_prompt, LlmTranslator, TranslateAction,
    TranslationRequest, Translator,
};
pub use actions::validate::{ValidationConfig, VerifySyntaxAction};
pub use actions::write::WriteFilesAction;
pub use registry::{Action, ActionOutput, ActionRegistry};

use std::path::Path;
use std::sync::Arc;

/// Create the registry with every builtin action rooted at `workspace_root`.
pub fn create_default_registry(
    workspace_root: impl AsRef<Path>,
    translator: Arc<dyn Translator>,
    validation: ValidationConfig,
) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    let root = workspace_root.as_ref();

    // --- Source acquisition ---
    registry.register(CloneRepoAction::new(root));
    registry.register(ListFilesAction::new(root));
    registry.register(ReadFilesAction::new(root));

    // --- Conversion ---
    registry.register(TranslateAction::new(root, translator));
    registry.register(WriteFilesAction::new(root));
    registry.register(VerifySyntaxAction::new(root, validation));

    registry
}
