//! Kiosk Agent Entry Point
//!
//! Reads utterances from stdin, one per line, and prints every turn as a
//! JSON line.
//!
//! ```text
//! kiosk-agent [--session <id>]
//! kiosk-agent --train-model <path>
//! ```

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use kiosk_agent_agent::DialoguePipeline;
use kiosk_agent_config::{load_settings, Settings, StaticMenuCatalog};
use kiosk_agent_core::MenuCatalog;
use kiosk_agent_text_processing::IntentModel;

enum Command {
    Repl { session: Option<String> },
    TrainModel { path: String },
}

fn parse_args() -> anyhow::Result<Command> {
    let mut args = std::env::args().skip(1);
    let mut session = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--train-model" => {
                let path = args.next().context("--train-model needs a path")?;
                return Ok(Command::TrainModel { path });
            },
            "--session" => {
                session = Some(args.next().context("--session needs an id")?);
            },
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(Command::Repl { session })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = parse_args()?;

    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var("KIOSK_AGENT_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing is not initialized yet
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&config);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        config_env = env.as_deref().unwrap_or("default"),
        "Starting kiosk agent"
    );

    match command {
        Command::TrainModel { path } => train_model(&config, &path),
        Command::Repl { session } => repl(&config, session).await,
    }
}

fn train_model(config: &Settings, path: &str) -> anyhow::Result<()> {
    let catalog = StaticMenuCatalog::from_path_or_default(config.menu_path.as_deref())?;
    let model = IntentModel::train_bundled(&catalog.names(), config.classifier.softmax_temperature)?;
    model
        .save(path)
        .with_context(|| format!("writing intent model to {}", path))?;
    tracing::info!(
        path,
        vocabulary = model.vocabulary_size(),
        "Intent model written"
    );
    Ok(())
}

async fn repl(config: &Settings, session: Option<String>) -> anyhow::Result<()> {
    let pipeline = DialoguePipeline::from_settings(config)?;
    let shutdown = pipeline.sessions().start_cleanup_task();

    let mut session_id = session;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let turn = pipeline
            .handle_utterance(session_id.as_deref(), &line)
            .await?;
        println!("{}", serde_json::to_string(&turn)?);
        session_id = Some(turn.session_id);
    }

    let _ = shutdown.send(true);
    tracing::info!("Input closed; shutting down");
    Ok(())
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("kiosk_agent={}", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    subscriber.with(fmt_layer).init();
}
