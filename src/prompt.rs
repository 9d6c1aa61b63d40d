//! Prompts that open a run

use codeshift_core::RunConfig;

const DEFAULT_PREAMBLE: &str = "You are a world-class code migration assistant. You work only \
through the provided tools, one step at a time, and you stop calling tools once the \
conversion is complete.";

/// System prompt: the preamble (or a configured replacement) followed by the
/// actions' own guidance.
pub fn system_prompt(preamble: Option<&str>, action_prompts: &str) -> String {
    let preamble = preamble
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(DEFAULT_PREAMBLE);
    if action_prompts.is_empty() {
        preamble.to_string()
    } else {
        format!("{}\n\n{}", preamble, action_prompts)
    }
}

/// The human instruction every run starts from.
pub fn initial_prompt(config: &RunConfig) -> String {
    let src = &config.source_language;
    let dst = &config.target_language;
    let workflow = &config.workflow;

    let discovery = match workflow.discovery_action.as_deref() {
        Some(action) => format!(
            "2. List the files under `{repo}` with {action}. Matching {src} files are queued and \
             run through {per_item} one at a time without further instructions.\n",
            repo = config.repo_path,
            per_item = workflow.per_item_action,
        ),
        None => format!(
            "2. List the files under `{repo}`, read the {src} sources with read_files, and convert \
             each one with translate.\n",
            repo = config.repo_path,
        ),
    };

    format!(
        "Convert the {src} code in the repository at {url} to {dst}.\n\n\
         Steps:\n\
         1. Clone the repository into `{repo}` with clone_repo.\n\
         {discovery}\
         3. Write every translated file into `{out}` at its target_path with write_files, \
         preserving the original relative structure and using the {ext} extension.\n\
         4. Check the written {dst} files with verify_syntax and fix any file that reports a \
         diagnostic.\n\
         5. Keep the behaviour of the original code and produce idiomatic, documented {dst}.\n\n\
         When everything is converted and verified, reply with a short summary and no tool calls.",
        url = config.source_url,
        repo = config.repo_path,
        out = config.output_path,
        ext = config.target_extension,
    )
}

/// Planning pass: once the oracle first stops, ask it to lay out the conversion
/// before it continues.
pub fn plan_prompt(config: &RunConfig) -> String {
    format!(
        "Analyze the {src} files read so far and write a structured plan for converting them \
         to {dst}. Group related files and modules, note shared utilities and imports, and \
         call out files that need special attention. Then carry out the plan with the tools.",
        src = config.source_language,
        dst = config.target_language,
    )
}

/// Review pass: a static check of the written output before the run ends.
pub fn review_prompt(config: &RunConfig) -> String {
    format!(
        "Now review the {dst} files written to `{out}`:\n\
         1. Look for syntax issues.\n\
         2. Check that every import is valid.\n\
         3. Check that relative paths were preserved.\n\
         4. Check that object and method usage is consistent.\n\
         5. Fix any problem you find with the tools.\n\n\
         If everything looks good, confirm the conversion is complete with no tool calls.",
        dst = config.target_language,
        out = config.output_path,
    )
}

/// The plan and review passes, in the order they follow each finish.
pub fn plan_and_review(config: &RunConfig) -> Vec<String> {
    vec![plan_prompt(config), review_prompt(config)]
}
