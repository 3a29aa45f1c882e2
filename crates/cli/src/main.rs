//! `code-node` CLI entry-point.
//!
//! Available sub-commands:
//! - `run`      — replay recorded script results through a Code node.
//! - `validate` — check a single recorded return value against the item
//!   contract.
//!
//! Output items are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use engine::{CodeNodeDefinition, CodeNodeExecutor, EngineError, ExecutorConfig};
use nodes::code::NounForms;
use nodes::replay::{Recording, ReplayEngine};
use nodes::{CodeError, Item, RunMode, TextKeys};

#[derive(Parser)]
#[command(
    name = "code-node",
    about = "Validate and normalize Code node results",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Executor configuration file (JSON).
    #[arg(long, global = true, env = "CODE_NODE_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of each-item calls in flight.
    #[arg(long, global = true, env = "CODE_NODE_ITEM_CONCURRENCY")]
    item_concurrency: Option<usize>,

    /// Noun used in diagnostics, e.g. "object".
    #[arg(long, global = true, requires = "noun_plural")]
    noun: Option<String>,

    /// Plural of `--noun`.
    #[arg(long, global = true, requires = "noun")]
    noun_plural: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Replay recorded results through a Code node and print its output.
    Run {
        /// `all-items` or `each-item`.
        #[arg(long, default_value = "all-items")]
        mode: RunMode,
        /// Recorded results: the returned value (all-items) or an array of
        /// returned values, one per input item (each-item).
        #[arg(long)]
        results: PathBuf,
        /// Input items (JSON array).  Defaults to one empty item.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Replace failures with error items instead of failing.
        #[arg(long)]
        continue_on_fail: bool,
    },
    /// Validate one recorded return value.
    Validate {
        #[arg(long, default_value = "all-items")]
        mode: RunMode,
        /// Path to the returned value (JSON).
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Run {
            mode,
            results,
            input,
            continue_on_fail,
        } => {
            let recording = Recording::from_value(mode, read_json(&results)?)?;
            let input = match input {
                Some(path) => serde_json::from_value::<Vec<Item>>(read_json(&path)?)
                    .with_context(|| format!("{} is not an array of items", path.display()))?,
                None => vec![Item::default()],
            };

            let mut node = CodeNodeDefinition::new("Code", mode);
            node.continue_on_fail = continue_on_fail;

            let executor = CodeNodeExecutor::new(Arc::new(ReplayEngine::new(recording)), config);
            match executor.run(&node, input, CancellationToken::new()).await {
                Ok(run) => {
                    info!("{} items emitted, {} errors", run.output.len(), run.errors);
                    println!("{}", serde_json::to_string_pretty(&run.output)?);
                }
                Err(err) => exit_with(&err),
            }
        }
        Command::Validate { mode, path } => {
            let value = read_json(&path)?;
            let recording = match mode {
                RunMode::AllItems => Recording::AllItems(value.into()),
                RunMode::EachItem => Recording::EachItem(vec![value.into()]),
            };
            let node = CodeNodeDefinition::new("Code", mode);
            let executor = CodeNodeExecutor::new(Arc::new(ReplayEngine::new(recording)), config);

            match executor.run(&node, vec![Item::default()], CancellationToken::new()).await {
                Ok(run) => println!("✅ Result is valid: {} item(s)", run.output.len()),
                Err(err) => exit_with(&err),
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<ExecutorConfig> {
    let mut config = match &cli.config {
        Some(path) => ExecutorConfig::from_file(path)?,
        None => ExecutorConfig::default(),
    };
    if let Some(item_concurrency) = cli.item_concurrency {
        config.item_concurrency = item_concurrency;
    }
    if let (Some(singular), Some(plural)) = (&cli.noun, &cli.noun_plural) {
        config.text_keys = TextKeys::new(NounForms::new(singular, plural));
    }
    config.validate()?;
    Ok(config)
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Print the full diagnostic and exit non-zero.
fn exit_with(err: &EngineError) -> ! {
    eprintln!("❌ {err}");
    if let Some(CodeError::Shape(violation)) = err.code_error() {
        eprintln!("   {}", violation.description);
        if let Some(index) = violation.item_index {
            eprintln!("   (item {index})");
        }
    }
    std::process::exit(1);
}
