use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use windrose::commands;
use windrose::config::Config;

#[derive(Parser)]
#[command(
    name = "windrose",
    version,
    about = "Batch geocoding aggregator that reconciles coordinates across multiple providers",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables apply when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a batch of address records against the enabled providers
    Resolve(ResolveArgs),

    /// Summarize a result store file
    Stats {
        /// Result store path
        #[arg(short, long)]
        store: PathBuf,
    },
}

#[derive(Args)]
struct ResolveArgs {
    /// Input CSV of address records
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Durable result store path
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Preload prior output to skip already-resolved work
    #[arg(long)]
    preload: bool,

    /// Newly processed records per burst
    #[arg(long)]
    burst_size: Option<usize>,

    /// Cooldown between bursts, in milliseconds
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Use the PTV provider
    #[arg(long)]
    use_ptv: bool,

    /// PTV API key
    #[arg(long)]
    ptv_apikey: Option<String>,

    /// Use the Google Maps provider
    #[arg(long)]
    use_google: bool,

    /// Google API key
    #[arg(long)]
    google_apikey: Option<String>,

    /// Use the Bing Maps provider
    #[arg(long)]
    use_bing: bool,

    /// Bing API key
    #[arg(long)]
    bing_apikey: Option<String>,
}

impl ResolveArgs {
    /// Command-line flags win over file/env configuration.
    fn apply(self, mut config: Config) -> Config {
        if let Some(input) = self.input {
            config.resolver.input = input;
        }
        if let Some(store) = self.store {
            config.resolver.store = store;
        }
        if self.preload {
            config.resolver.preload = true;
        }
        if let Some(burst_size) = self.burst_size {
            config.resolver.burst_size = burst_size;
        }
        if let Some(cooldown_ms) = self.cooldown_ms {
            config.resolver.cooldown_ms = cooldown_ms;
        }

        if self.use_ptv {
            config.providers.ptv.enabled = true;
        }
        if let Some(key) = self.ptv_apikey {
            config.providers.ptv.api_key = key;
        }
        if self.use_google {
            config.providers.google.enabled = true;
        }
        if let Some(key) = self.google_apikey {
            config.providers.google.api_key = key;
        }
        if self.use_bing {
            config.providers.bing.enabled = true;
        }
        if let Some(key) = self.bing_apikey {
            config.providers.bing.api_key = key;
        }

        config
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_format, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(2);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "windrose batch geocoding resolver"
    );

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            2
        }
    };

    process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Resolve(args) => {
            let outcome = commands::resolve(args.apply(config)).await?;
            Ok(outcome.exit_code())
        }
        Commands::Stats { store } => {
            commands::stats(store)?;
            Ok(0)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("windrose=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("windrose=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
