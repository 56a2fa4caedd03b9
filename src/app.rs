//! Application wiring.
//!
//! Builds the pipeline — controller, workers, queue, consumer, display —
//! and runs the terminal shell on the main thread while the async pieces run
//! on a tokio runtime.

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::core::generation::GenerationCounter;
use crate::core::history::ConversationHistory;
use crate::core::queue::EventQueue;
use crate::core::turn::{TurnController, TurnSettings};
use crate::paths;
use crate::prompt::PromptContext;
use crate::providers::{CompletionClient, OpenAiClient, OpenAiConfig};
use crate::transcript::{ChannelTranscriptSource, TranscriptSource};
use crate::ui::consumer::{DisplayConsumer, SharedDisplayLog};
use crate::ui::display::DisplayLog;
use crate::ui::tui::TuiShell;

/// CLI entry point.
pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(crate::paths::config_path);

    match cli.command {
        Some(Command::Init) => {
            Config::init(&config_path)?;
            println!("Created {}", config_path.display());
            Ok(())
        }
        Some(Command::Config) => {
            let config = Config::load_from(&config_path)?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{rendered}");
            Ok(())
        }
        Some(Command::Model { name }) => {
            Config::save_model_to(&config_path, &name)?;
            println!("Model set to {name}");
            Ok(())
        }
        None => run_copilot(&config_path),
    }
}

fn run_copilot(config_path: &std::path::Path) -> Result<()> {
    let config = Config::load_from(config_path)?;
    let _log_guard = init_logging()?;
    info!(config = %config_path.display(), model = %config.model, "starting sotto");

    let prompt = Arc::new(PromptContext::from_config(&config)?);
    let client_config = OpenAiConfig::from_env(
        config.model.clone(),
        config.max_output_tokens,
        config.effective_openai_base_url(),
    )?;
    let client: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(client_config));

    let generations = Arc::new(GenerationCounter::new());
    let queue = Arc::new(EventQueue::new());
    let history = Arc::new(Mutex::new(ConversationHistory::new(
        config.history_max_turns,
    )));
    let log: SharedDisplayLog = Arc::new(Mutex::new(DisplayLog::new(config.display_max_lines)));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let consumer = DisplayConsumer::new(
        Arc::clone(&queue),
        Arc::clone(&generations),
        Arc::clone(&log),
        config.consumer_batch_size,
    );
    let consumer_task = runtime.spawn(consumer.run(config.poll_interval()));

    let (transcript_tx, source) = ChannelTranscriptSource::new();
    let controller = TurnController::new(
        Arc::clone(&generations),
        Arc::clone(&queue),
        Arc::clone(&history),
        client,
        prompt,
        TurnSettings {
            min_question_chars: config.min_question_chars,
            worker_join_timeout: config.worker_join_timeout(),
        },
    );
    let coordinator_task = runtime.spawn(coordinate_turns(controller, source));

    let shell = TuiShell::new(log, transcript_tx, queue, generations);
    let result = shell.run();

    coordinator_task.abort();
    consumer_task.abort();
    // A superseded worker may still sit in a network read; don't wait for it.
    runtime.shutdown_timeout(Duration::from_millis(500));

    result
}

/// Feeds finalized transcripts into the controller.
///
/// This is the pipeline's only turn-starting entry point; interim transcripts
/// never reach it.
async fn coordinate_turns(mut controller: TurnController, mut source: impl TranscriptSource) {
    while let Some(text) = source.next_final().await {
        controller.submit_question(&text).await;
    }
}

/// Routes tracing output to a file under the sotto home dir.
///
/// The terminal belongs to the shell; writing logs to stderr would corrupt
/// the display. Filter with `RUST_LOG` (default `sotto=info`).
fn init_logging() -> Result<WorkerGuard> {
    let dir = paths::logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, "sotto.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sotto=info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}
