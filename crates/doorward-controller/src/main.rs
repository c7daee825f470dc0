//! Doorward - Biometric + PIN door controller

use std::io::BufRead;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use doorward_core::{
    credentials::hash_pin, BiometricMatcher, CsvEventLog, Orchestrator, SystemClock,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use doorward_controller::{
    ConsoleInput, ControllerConfig, ReplayMatcher, TracingIndicators, UnavailableMatcher,
};

/// Doorward - single-door access controller
#[derive(Parser)]
#[command(name = "doorward")]
#[command(about = "Biometric and PIN door access controller")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the controller configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the door controller (default)
    Run {
        /// Replay recorded matcher frames from a JSON file
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Override the event log location
        #[arg(long)]
        event_log: Option<PathBuf>,
    },

    /// Hash a PIN read from stdin for use in the configuration file
    HashPin,

    /// Print the active configuration with PINs masked
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "doorward=info,doorward_core=info,doorward_controller=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = ControllerConfig::resolve_path(cli.config);

    match cli.command.unwrap_or(Commands::Run {
        replay: None,
        event_log: None,
    }) {
        Commands::Run { replay, event_log } => {
            let mut config = ControllerConfig::load_or_init(&config_path)?;
            if let Some(path) = event_log {
                config.event_log = path;
            }
            run(config, replay).await?;
        }

        Commands::HashPin => {
            let mut line = Zeroizing::new(String::new());
            std::io::stdin().lock().read_line(&mut line)?;
            let pin = line.trim();
            if pin.is_empty() {
                anyhow::bail!("no PIN given on stdin");
            }
            println!("{}", hash_pin(pin)?);
        }

        Commands::ShowConfig => {
            let config = ControllerConfig::load_or_default(&config_path)?;
            println!("# {}", config_path.display());
            print!("{}", toml::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}

async fn run(config: ControllerConfig, replay: Option<PathBuf>) -> anyhow::Result<()> {
    info!("Starting Doorward v{}", env!("CARGO_PKG_VERSION"));

    let store = config.credential_store()?;
    let matcher: Box<dyn BiometricMatcher + Send> = match replay {
        Some(path) => {
            let matcher = ReplayMatcher::load(&path)?;
            info!("Replaying {} frames from {:?}", matcher.len(), path);
            Box::new(matcher)
        }
        None => {
            warn!("No matcher configured; every capture will fall back to PIN");
            Box::new(UnavailableMatcher)
        }
    };

    let input = ConsoleInput::spawn_stdin();
    let interrupt = input.interrupt_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            interrupt.interrupt();
        }
    });

    info!("Event log: {:?}", config.event_log);
    let mut orchestrator = Orchestrator::new(
        store,
        matcher,
        input,
        TracingIndicators::new(),
        SystemClock,
        CsvEventLog::new(config.event_log),
    );

    tokio::task::spawn_blocking(move || orchestrator.run()).await?;

    println!("Goodbye.");
    Ok(())
}
