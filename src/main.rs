//! Scribe - Tool-Calling Code Translation Agent
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use scribe::agent::{TaskTemplate, TranslationMode};
use scribe::{Config, Orchestrator};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Scribe - Tool-Calling Code Translation Agent
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Maximum number of agent steps
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// Working directory for commands and relative paths
    #[arg(long, short = 'w', global = true)]
    workdir: Option<PathBuf>,

    /// Config file (defaults to ~/.config/scribe/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a free-form task
    Run {
        /// Task text
        #[arg(long, short = 't', conflicts_with = "task_file", required_unless_present = "task_file")]
        task: Option<String>,

        /// Read the task from a file
        #[arg(long)]
        task_file: Option<PathBuf>,
    },

    /// Translate one source file with a built-in task template
    Translate {
        /// Source file, relative to the working directory
        source: PathBuf,

        /// Let the translator CLI draft the code, or have the agent write it
        #[arg(long, value_enum, default_value_t = TranslationMode::CodeScribe)]
        mode: TranslationMode,

        /// Prompt config for the translator's `translate` step
        #[arg(long)]
        translate_config: Option<String>,

        /// Prompt config for the translator's `update` step
        #[arg(long)]
        build_config: Option<String>,
    },

    /// Print the effective configuration
    Config {
        /// Print the default config file path instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.common.debug { "scribe=debug" } else { "scribe=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Build configuration
    let mut config = match &cli.common.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    // Apply CLI overrides
    if let Some(max_steps) = cli.common.max_steps {
        config.agent.max_steps = max_steps;
    }
    if let Some(ref workdir) = cli.common.workdir {
        config.sandbox.working_dir = workdir.clone();
    }

    let task = match cli.command {
        Command::Config { path } => {
            if path {
                println!("{}", Config::config_file().display());
            } else {
                print!("{}", config.to_toml()?);
            }
            return Ok(());
        }
        Command::Run { task, task_file } => match (task, task_file) {
            (Some(task), _) => task,
            (None, Some(file)) => std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read task file {}", file.display()))?,
            (None, None) => anyhow::bail!("either --task or --task-file is required"),
        },
        Command::Translate {
            source,
            mode,
            translate_config,
            build_config,
        } => {
            let mut template = TaskTemplate::new(source, mode)
                .with_build_command(config.sandbox.build_command.clone());
            if let Some(path) = translate_config {
                template = template.with_translate_config(path);
            }
            if let Some(path) = build_config {
                template = template.with_build_config(path);
            }
            template.render()
        }
    };

    let orchestrator = Orchestrator::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            on_signal.cancel();
        }
    });

    let report = orchestrator.run(&task, &cancel).await;
    if !report.outcome.is_completed() {
        eprintln!(
            "--- transcript ---\n{}\n--- end of transcript ---",
            report.conversation.transcript()
        );
    }
    println!("{}", report.summary());

    std::process::exit(report.outcome.exit_code());
}
