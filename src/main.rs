//! codeshift - convert a repository to another language with an LLM in the loop
//!
//! Usage:
//!   codeshift run --repo URL                  -> clone, convert, verify
//!   codeshift run --repo URL --config c.toml  -> same, with overrides from TOML
//!   codeshift dump-config                     -> print the effective configuration

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use codeshift::{build_executor, initial_state, prompt, report, CodeshiftConfig};
use codeshift_llm::{AnthropicProvider, CancellationToken};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "codeshift",
    about = "Convert a repository to another language, one file at a time",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a conversion
    Run(RunArgs),
    /// Print the effective configuration as TOML
    DumpConfig {
        /// Path to config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Repository URL to convert
    #[arg(long)]
    repo: String,

    /// Working directory for the clone and the output
    #[arg(short, long, default_value = "codeshift-work")]
    workspace: PathBuf,

    /// Path to config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    source_language: Option<String>,

    #[arg(long)]
    target_language: Option<String>,

    /// Only queue discovered files ending with this suffix (case-sensitive)
    #[arg(long)]
    suffix: Option<String>,

    /// Stop after this many steps
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Ask for a conversion plan and a final review before finishing
    /// (ignored when the config already lists follow-up prompts)
    #[arg(long)]
    plan_and_review: bool,

    /// Write logs to a file (in addition to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let _guard = init_tracing(args.log_file.as_deref())?;
            run(args).await
        }
        Commands::DumpConfig { config } => {
            let _guard = init_tracing(None)?;
            print!("{}", load_config(config.as_deref()).to_toml());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> CodeshiftConfig {
    path.map(CodeshiftConfig::load).unwrap_or_default()
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref());
    config.run.source_url = args.repo.clone();
    if let Some(lang) = args.source_language {
        config.run.source_language = lang;
    }
    if let Some(lang) = args.target_language {
        config.run.target_language = lang;
    }
    if let Some(suffix) = args.suffix {
        config.run.workflow.item_suffix = Some(suffix);
    }
    if let Some(cap) = args.max_iterations {
        config.executor.max_iterations = cap;
    }
    if args.plan_and_review && config.run.workflow.follow_ups.is_empty() {
        config.run.workflow.follow_ups = prompt::plan_and_review(&config.run);
    }

    let api_key = std::env::var(&config.oracle.api_key_env)
        .with_context(|| format!("{} not set", config.oracle.api_key_env))?;

    std::fs::create_dir_all(&args.workspace)
        .with_context(|| format!("cannot create workspace {}", args.workspace.display()))?;

    let mut provider = AnthropicProvider::new(api_key);
    if let Some(url) = &config.oracle.base_url {
        provider = provider.with_base_url(url.clone());
    }

    let executor = build_executor(&config, &args.workspace, Arc::new(provider));
    let state = initial_state(&config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current step");
            on_interrupt.cancel();
        }
    });

    tracing::info!(
        "converting {} ({} -> {}) in {}",
        config.run.source_url,
        config.run.source_language,
        config.run.target_language,
        args.workspace.display()
    );

    let outcome = executor
        .run_cancellable(state, cancel)
        .await
        .context("conversion run failed")?;

    println!("{}", report::summary(&outcome));
    outcome.into_result().context("conversion did not complete")?;
    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("invalid log file path {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codeshift=info,codeshift_engine=info,codeshift_actions=info,codeshift_llm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}
