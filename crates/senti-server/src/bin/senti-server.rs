//! senti-server binary

use clap::{Parser, Subcommand};
use senti_core::Settings;
use senti_model::model_manager;
use senti_server::telemetry::init_from_settings;
use senti_server::{serve, Result};
use std::path::PathBuf;
use tracing::{error, info};

/// Sentence used to check a freshly built model
const SMOKE_TEST_TEXT: &str = "This is a test.";

#[derive(Parser)]
#[command(name = "senti-server")]
#[command(about = "Lazily-loaded sentiment inference service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "SENTI_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log format (json or text)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Build the model into the cache and run a test prediction
    Download,
    /// Print the effective configuration
    Config {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve { host, port }) => run_server(settings, host, port).await,
        Some(Commands::Download) => download(settings).await,
        Some(Commands::Config { output }) => print_config(&settings, output),
        None => run_server(settings, None, None).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load_with(cli.config.as_deref(), None)?;

    if let Some(ref level) = cli.log_level {
        settings.logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        settings.logging.format = format.clone();
    }

    Ok(settings)
}

async fn run_server(mut settings: Settings, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    settings.validate()?;

    init_from_settings(&settings)?;
    serve(settings).await
}

/// Pre-populate the model cache so the first request does not pay for it
async fn download(settings: Settings) -> Result<()> {
    init_from_settings(&settings)?;

    let model_dir = settings.model.model_dir();
    tokio::fs::create_dir_all(&model_dir).await?;
    info!(model = %settings.model.name, dir = %model_dir.display(), "Preparing model");

    let manager = model_manager(&settings.model)?;
    let model = manager.acquire().await?;
    let prediction = model.classify(SMOKE_TEST_TEXT).await?;

    println!("Model {} is ready in {}", settings.model.name, model_dir.display());
    println!(
        "Test prediction for {:?}: {} ({:.4})",
        SMOKE_TEST_TEXT, prediction.label, prediction.score
    );
    Ok(())
}

fn print_config(settings: &Settings, output: Option<PathBuf>) -> Result<()> {
    let yaml = settings.to_yaml()?;

    match output {
        Some(path) => {
            std::fs::write(&path, yaml)?;
            println!("Configuration written to {}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

