//! Keyboard History - Command Line Entry Point
//!
//! Replays and inspects exported keyboard histories.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use keyhistory_rs::{
    EventBus, HistoryConfig, HistoryExport, KeyboardHistory, ReplayTiming, SignalHub,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "keyhistory", version, about = "Replay and inspect keyboard histories")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "KEYHISTORY_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay an export, printing each notification as a JSON line
    Replay {
        /// Export file or bare JSON array of events
        file: PathBuf,

        /// Replay speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        /// Delay computation
        #[arg(long, value_enum)]
        timing: Option<TimingArg>,
    },
    /// Validate an export and print a summary
    Inspect {
        /// Export file or bare JSON array of events
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TimingArg {
    PerGap,
    DriftCorrecting,
}

impl From<TimingArg> for ReplayTiming {
    fn from(arg: TimingArg) -> Self {
        match arg {
            TimingArg::PerGap => ReplayTiming::PerGap,
            TimingArg::DriftCorrecting => ReplayTiming::DriftCorrecting,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<HistoryConfig> {
    match path {
        Some(path) => HistoryConfig::load(path).with_context(|| format!("loading {:?}", path)),
        None => Ok(HistoryConfig::load_or_default()),
    }
}

async fn replay(
    mut config: HistoryConfig,
    file: PathBuf,
    speed: Option<f64>,
    timing: Option<TimingArg>,
) -> anyhow::Result<()> {
    if let Some(speed) = speed {
        config.replay_speed = speed;
    }
    if let Some(timing) = timing {
        config.replay_timing = timing.into();
    }

    let json = std::fs::read_to_string(&file).with_context(|| format!("reading {:?}", file))?;
    let events = HistoryExport::events_from_json(&json)?;

    let bus = Arc::new(EventBus::new());
    let history = KeyboardHistory::new(config, Arc::new(SignalHub::new()), bus.clone());
    bus.subscribe(history.replay_channel().to_string(), |notification| {
        match serde_json::to_string(notification) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!("Failed to serialize notification: {}", e),
        }
    });

    tracing::info!("Replaying {} events from {:?}", events.len(), file);
    history.replay(Some(events))?;

    tokio::select! {
        _ = history.wait_until_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            history.stop_replay();
        }
    }
    Ok(())
}

fn inspect(file: PathBuf) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&file).with_context(|| format!("reading {:?}", file))?;
    let events = HistoryExport::events_from_json(&json)?;
    let export = HistoryExport::new(events, None);

    println!("events:    {}", export.metadata.total_events);
    println!("duration:  {:.3}ms", export.metadata.recording_duration);
    if let Some(first) = export.events.first() {
        println!("first key: {} at {}ms", first.key, first.timestamp);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,keyhistory_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Replay { file, speed, timing } => replay(config, file, speed, timing).await,
        Command::Inspect { file } => inspect(file),
    }
}
