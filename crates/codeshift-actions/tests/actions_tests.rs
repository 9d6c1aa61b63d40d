//! Tests for codeshift-actions: registry dispatch and every builtin action against a real filesystem

use codeshift_actions::*;
use codeshift_core::{ActionInvocation, ActionOutcome, FailureKind, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

struct StubTranslator;

#[async_trait::async_trait]
impl Translator for StubTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String> {
        Ok(format!("# {} from {}\n{}", request.target_language, request.identifier, request.source.len()))
    }
}

struct FailingTranslator;

#[async_trait::async_trait]
impl Translator for FailingTranslator {
    async fn translate(&self, _request: &TranslationRequest) -> Result<String> {
        Err(codeshift_core::Error::oracle_unavailable("model down"))
    }
}

struct PanicAction;

#[async_trait::async_trait]
impl Action for PanicAction {
    fn name(&self) -> &str { "explode" }
    fn description(&self) -> &str { "panics" }
    fn input_schema(&self) -> Value { json!({"type": "object"}) }
    async fn execute(&self, _args: Value) -> ActionOutput {
        panic!("kaboom")
    }
}

struct SlowAction;

#[async_trait::async_trait]
impl Action for SlowAction {
    fn name(&self) -> &str { "slow" }
    fn description(&self) -> &str { "sleeps" }
    fn input_schema(&self) -> Value { json!({"type": "object"}) }
    async fn execute(&self, _args: Value) -> ActionOutput {
        tokio::time::sleep(Duration::from_secs(5)).await;
        ActionOutput::text("finally")
    }
}

fn registry(root: &Path) -> ActionRegistry {
    create_default_registry(root, Arc::new(StubTranslator), ValidationConfig::default())
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

// ===========================================================================
// ActionOutput
// ===========================================================================

#[test]
fn action_output_into_outcome() {
    assert_eq!(ActionOutput::text("hi").into_outcome(), ActionOutcome::success("hi"));
    let failed = ActionOutput::error("boom").into_outcome();
    assert_eq!(failed, ActionOutcome::failure(FailureKind::Execution, "boom"));
    assert!(ActionOutput::error("x").is_error());
}

// ===========================================================================
// ActionRegistry
// ===========================================================================

#[test]
fn default_registry_lists_builtin_actions_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    assert_eq!(
        reg.list(),
        vec!["clone_repo", "list_files", "read_files", "translate", "verify_syntax", "write_files"]
    );
    let names: Vec<String> = reg.schemas().into_iter().map(|s| s.name).collect();
    assert_eq!(names[0], "clone_repo");
    assert!(reg.schemas().iter().all(|s| s.input_schema["type"] == "object"));
    assert!(reg.combined_prompts().contains("write_files"));
}

#[tokio::test]
async fn dispatch_unknown_action_is_failure_result() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let inv = ActionInvocation::new("call_1", "delete_everything", json!({}));
    let result = reg.dispatch(&inv, None).await;
    assert_eq!(result.invocation_id, inv.id);
    assert!(matches!(
        result.outcome,
        ActionOutcome::Failure { kind: FailureKind::UnknownAction, .. }
    ));
}

#[tokio::test]
async fn dispatch_absorbs_panics() {
    let mut reg = ActionRegistry::new();
    reg.register(PanicAction);
    let inv = ActionInvocation::new("call_1", "explode", json!({}));
    let result = reg.dispatch(&inv, None).await;
    match result.outcome {
        ActionOutcome::Failure { kind, message } => {
            assert_eq!(kind, FailureKind::Execution);
            assert!(message.contains("kaboom"));
        }
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn dispatch_enforces_deadline() {
    let mut reg = ActionRegistry::new();
    reg.register(SlowAction);
    let inv = ActionInvocation::new("call_1", "slow", json!({}));
    let result = reg.dispatch(&inv, Some(Duration::from_millis(50))).await;
    assert!(matches!(result.outcome, ActionOutcome::Failure { kind: FailureKind::Timeout, .. }));
}

#[tokio::test]
async fn dispatch_all_preserves_declared_order() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let invocations = vec![
        ActionInvocation::new("c", "list_files", json!({"directory_path": "nowhere"})),
        ActionInvocation::new("a", "nope", json!({})),
        ActionInvocation::new("b", "read_files", json!({"file_paths": []})),
    ];
    let results = reg.dispatch_all(&invocations, None).await;
    let ids: Vec<&str> = results.iter().map(|r| r.invocation_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
    assert!(!results[0].is_failure());
    assert!(results[1].is_failure());
}

// ===========================================================================
// clone_repo
// ===========================================================================

#[tokio::test]
async fn clone_missing_url_fails() {
    let dir = tempfile::tempdir().unwrap();
    let action = CloneRepoAction::new(dir.path());
    assert!(action.execute(json!({"local_path": "cloned"})).await.is_error());
}

#[tokio::test]
async fn clone_bad_source_fails_and_clears_destination() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cloned/stale.js", "old");
    let action = CloneRepoAction::new(dir.path()).with_timeout(30);
    let missing = dir.path().join("no-such-repo");
    let result = action
        .execute(json!({"repo_url": missing.to_string_lossy(), "local_path": "cloned"}))
        .await;
    assert!(result.is_error());
    assert!(!dir.path().join("cloned/stale.js").exists());
}

// ===========================================================================
// list_files
// ===========================================================================

#[tokio::test]
async fn list_files_sorted_and_prefixed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cloned/src/b.js", "b");
    write(dir.path(), "cloned/a.js", "a");
    write(dir.path(), "cloned/.git/HEAD", "ref");
    write(dir.path(), "cloned/README.md", "# readme");

    let result = ListFilesAction::new(dir.path())
        .execute(json!({"directory_path": "cloned"}))
        .await;
    match result {
        ActionOutput::Json(v) => assert_eq!(
            v,
            json!(["cloned/README.md", "cloned/a.js", "cloned/src/b.js"])
        ),
        other => panic!("Expected Json, got {:?}", other),
    }
}

#[tokio::test]
async fn list_files_missing_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let result = ListFilesAction::new(dir.path())
        .execute(json!({"directory_path": "absent"}))
        .await;
    assert!(matches!(result, ActionOutput::Json(ref v) if v == &json!([])));
}

// ===========================================================================
// read_files / write_files
// ===========================================================================

#[tokio::test]
async fn read_files_tolerates_missing_entries() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cloned/a.js", "const a = 1;");
    let result = ReadFilesAction::new(dir.path())
        .execute(json!({"file_paths": ["cloned/a.js", "cloned/missing.js"]}))
        .await;
    match result {
        ActionOutput::Json(v) => {
            assert_eq!(v["cloned/a.js"], "const a = 1;");
            assert!(v["cloned/missing.js"].as_str().unwrap().starts_with("Error reading file:"));
        }
        other => panic!("Expected Json, got {:?}", other),
    }
}

#[tokio::test]
async fn write_files_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let result = WriteFilesAction::new(dir.path())
        .execute(json!({
            "files": {"src/deep/a.py": "a = 1\n", "b.py": "b = 2\n"},
            "base_path": "converted"
        }))
        .await;
    assert!(!result.is_error());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("converted/src/deep/a.py")).unwrap(),
        "a = 1\n"
    );
    assert!(dir.path().join("converted/b.py").exists());
}

#[tokio::test]
async fn write_files_rejects_non_string_content() {
    let dir = tempfile::tempdir().unwrap();
    let result = WriteFilesAction::new(dir.path())
        .execute(json!({"files": {"a.py": 3}, "base_path": "out"}))
        .await;
    assert!(result.is_error());
}

// ===========================================================================
// Workspace containment
// ===========================================================================

#[tokio::test]
async fn clone_refuses_destination_outside_workspace() {
    let workspace = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    write(elsewhere.path(), "keep.txt", "important");
    let action = CloneRepoAction::new(workspace.path()).with_timeout(30);

    let absolute = action
        .execute(json!({
            "repo_url": "file:///no/such/repository",
            "local_path": elsewhere.path().to_string_lossy()
        }))
        .await;
    assert!(absolute.is_error());
    assert!(elsewhere.path().join("keep.txt").exists());

    let climbing = action
        .execute(json!({"repo_url": "file:///no/such/repository", "local_path": "../outside"}))
        .await;
    assert!(climbing.is_error());
}

#[tokio::test]
async fn clone_refuses_workspace_root_as_destination() {
    let workspace = tempfile::tempdir().unwrap();
    write(workspace.path(), "notes.txt", "keep");
    let action = CloneRepoAction::new(workspace.path()).with_timeout(30);
    let result = action
        .execute(json!({"repo_url": "file:///no/such/repository", "local_path": "cloned/.."}))
        .await;
    assert!(result.is_error());
    assert!(workspace.path().join("notes.txt").exists());
}

#[tokio::test]
async fn write_files_refuses_paths_outside_workspace() {
    let outer = tempfile::tempdir().unwrap();
    let workspace = outer.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();
    let action = WriteFilesAction::new(&workspace);

    let result = action
        .execute(json!({"files": {"ok.py": "x = 1\n", "../escaped.txt": "x"}, "base_path": "."}))
        .await;
    assert!(result.is_error());
    assert!(!outer.path().join("escaped.txt").exists());
    assert!(!workspace.join("ok.py").exists());

    let result = action
        .execute(json!({"files": {"a.py": "x"}, "base_path": outer.path().to_string_lossy()}))
        .await;
    assert!(result.is_error());
    assert!(!outer.path().join("a.py").exists());
}

#[tokio::test]
async fn write_files_allows_dotdot_that_stays_inside() {
    let dir = tempfile::tempdir().unwrap();
    let result = WriteFilesAction::new(dir.path())
        .execute(json!({"files": {"../shared/util.py": "u = 1\n"}, "base_path": "converted"}))
        .await;
    assert!(!result.is_error());
    assert!(dir.path().join("shared/util.py").exists());
}

#[tokio::test]
async fn read_list_translate_refuse_escaping_paths() {
    let outer = tempfile::tempdir().unwrap();
    let workspace = outer.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();
    write(outer.path(), "secret.js", "const key = 1;");

    let read = ReadFilesAction::new(&workspace)
        .execute(json!({"file_paths": ["../secret.js"]}))
        .await;
    match read {
        ActionOutput::Json(v) => {
            let text = v["../secret.js"].as_str().unwrap();
            assert!(text.starts_with("Error reading file:"));
            assert!(!text.contains("const key"));
        }
        other => panic!("Expected Json, got {:?}", other),
    }

    let list = ListFilesAction::new(&workspace)
        .execute(json!({"directory_path": ".."}))
        .await;
    assert!(list.is_error());

    let translate = TranslateAction::new(&workspace, Arc::new(StubTranslator))
        .execute(json!({"path": outer.path().join("secret.js").to_string_lossy()}))
        .await;
    assert!(translate.is_error());
}

// ===========================================================================
// translate
// ===========================================================================

#[test]
fn target_path_strips_root_and_swaps_extension() {
    assert_eq!(target_path("cloned/src/a.js", Some("cloned"), ".py"), "src/a.py");
    assert_eq!(target_path("lib/b.js", Some("cloned"), "py"), "lib/b.py");
    assert_eq!(target_path("c.js", None, ".rs"), "c.rs");
}

#[test]
fn clean_output_strips_fences_and_preamble() {
    assert_eq!(clean_output("```python\nprint(1)\n```"), "print(1)");
    assert_eq!(
        clean_output("Here's the converted Python code:\n```\nx = 1\n```\nHope it helps."),
        "x = 1"
    );
    assert_eq!(clean_output("Sure, here's the Python version:\nx = 2"), "x = 2");
    assert_eq!(clean_output("  y = 3  "), "y = 3");
}

#[test]
fn translation_prompt_names_languages() {
    let prompt = translation_prompt(&TranslationRequest {
        identifier: "a.js".into(),
        source: "let x = 1;".into(),
        source_language: "javascript".into(),
        target_language: "python".into(),
    });
    assert!(prompt.contains("javascript code to clean, runnable python code"));
    assert!(prompt.ends_with("let x = 1;"));
}

#[tokio::test]
async fn translate_reads_path_and_reports_target() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cloned/src/a.js", "let x = 1;");
    let action = TranslateAction::new(dir.path(), Arc::new(StubTranslator));
    let result = action
        .execute(json!({
            "path": "cloned/src/a.js",
            "source_root": "cloned",
            "source_language": "javascript",
            "target_language": "python",
            "target_extension": ".py"
        }))
        .await;
    match result {
        ActionOutput::Json(v) => {
            assert_eq!(v["identifier"], "cloned/src/a.js");
            assert_eq!(v["target_path"], "src/a.py");
            assert_eq!(v["content"], "# python from cloned/src/a.js\n10");
        }
        other => panic!("Expected Json, got {:?}", other),
    }
}

#[tokio::test]
async fn translate_inline_source_uses_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let action = TranslateAction::new(dir.path(), Arc::new(StubTranslator));
    let result = action
        .execute(json!({
            "source": "abc",
            "identifier": "util.js",
            "source_language": "javascript",
            "target_language": "rust",
            "target_extension": ".rs"
        }))
        .await;
    assert!(matches!(result, ActionOutput::Json(ref v) if v["target_path"] == "util.rs"));
}

#[tokio::test]
async fn translate_failures_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let stub = TranslateAction::new(dir.path(), Arc::new(StubTranslator));
    assert!(stub.execute(json!({"path": "missing.js"})).await.is_error());
    assert!(stub.execute(json!({"target_language": "python"})).await.is_error());

    write(dir.path(), "a.js", "x");
    let failing = TranslateAction::new(dir.path(), Arc::new(FailingTranslator));
    match failing.execute(json!({"path": "a.js"})).await {
        ActionOutput::Error(e) => assert!(e.contains("model down")),
        other => panic!("Expected Error, got {:?}", other),
    }
}

// ===========================================================================
// verify_syntax
// ===========================================================================

fn grep_checker() -> ValidationConfig {
    let mut config = ValidationConfig::default();
    config.commands.insert(
        "toy".into(),
        vec![
            "sh".into(),
            "-c".into(),
            "if grep -q bad; then echo 'line 1: bad token' >&2; exit 1; fi".into(),
        ],
    );
    config
}

#[tokio::test]
async fn verify_syntax_reports_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let action = VerifySyntaxAction::new(dir.path(), grep_checker());
    let result = action
        .execute(json!({
            "files": {"good.toy": "fine", "broken.toy": "this is bad"},
            "language": "toy"
        }))
        .await;
    match result {
        ActionOutput::Json(v) => {
            assert_eq!(v["good.toy"], "OK");
            assert_eq!(v["broken.toy"], "Syntax error: line 1: bad token");
        }
        other => panic!("Expected Json, got {:?}", other),
    }
}

#[tokio::test]
async fn verify_syntax_unknown_language_fails() {
    let dir = tempfile::tempdir().unwrap();
    let action = VerifySyntaxAction::new(dir.path(), ValidationConfig::default());
    let result = action
        .execute(json!({"files": {"a.zz": ""}, "language": "cobol"}))
        .await;
    assert!(result.is_error());
}

#[test]
fn validation_config_defaults_and_lookup() {
    let config = ValidationConfig::default();
    assert!(config.command_for("Python").is_some());
    assert!(config.command_for("cobol").is_none());
    let parsed: ValidationConfig = serde_json::from_value(json!({"timeout_secs": 5})).unwrap();
    assert_eq!(parsed.timeout_secs, 5);
    assert!(parsed.commands.contains_key("python"));
}
