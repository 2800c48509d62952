//! picocalc-kbd - PicoCalc keyboard daemon
//!
//! Entry point for the daemon binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use picocalc_kbd::config::Config;
use picocalc_kbd::server::KbdServer;

/// Command-line arguments for picocalc-kbd
#[derive(Parser, Debug)]
#[command(name = "picocalc-kbd")]
#[command(version, about = "PicoCalc keyboard driver with mouse emulation", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/picocalc-kbd/config.toml")]
    pub config: PathBuf,

    /// I2C bus device
    #[arg(short, long, env = "PICOCALC_I2C_DEVICE")]
    pub device: Option<PathBuf>,

    /// Keyboard controller address (e.g. 0x1f)
    #[arg(short, long, env = "PICOCALC_I2C_ADDRESS", value_parser = parse_address)]
    pub address: Option<u16>,

    /// Control socket path
    #[arg(short, long, env = "PICOCALC_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Log input events instead of creating a uinput device
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn parse_address(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Loaded before logging so the file's level and directory apply
    let loaded = if args.config.exists() {
        Config::load(&args.config).map(Some)
    } else {
        Ok(None)
    };
    let file_config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => Config::default_config(),
    };

    let _guard = init_logging(&args, &file_config)?;

    info!("════════════════════════════════════════════════════════");
    info!("  picocalc-kbd v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {} {}", env!("BUILD_DATE"), env!("BUILD_TIME"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    let config = match loaded {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::warn!("Config file {} not found, using defaults", args.config.display());
            Config::default_config()
        }
        Err(e) => {
            eprintln!("{}", picocalc_kbd::utils::format_user_error(&e));
            return Err(e);
        }
    };

    // Override config with CLI args
    let mut config = config.with_overrides(args.device.clone(), args.address, args.socket.clone());
    if args.dry_run {
        config.input.dry_run = true;
    }
    if let Err(e) = config.validate() {
        eprintln!("{}", picocalc_kbd::utils::format_user_error(&e));
        return Err(e);
    }

    info!("Configuration loaded successfully");
    tracing::debug!("Config: {:?}", config);

    picocalc_kbd::utils::log_startup_diagnostics(&config);

    let server = match KbdServer::new(config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", picocalc_kbd::utils::format_user_error(&e));
            return Err(e);
        }
    };

    if let Err(e) = server.run().await {
        eprintln!("{}", picocalc_kbd::utils::format_user_error(&e));
        return Err(e);
    }

    info!("picocalc-kbd shut down");
    Ok(())
}

fn init_logging(args: &Args, config: &Config) -> Result<Option<WorkerGuard>> {
    let log_level = match args.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("picocalc_kbd={level},warn", level = log_level))
    });

    let stdout_layer = match args.log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "compact" => tracing_subscriber::fmt::layer().compact().boxed(),
        _ => tracing_subscriber::fmt::layer().pretty().boxed(),
    };

    // --log-file wins over the configured log directory
    let appender = match (&args.log_file, &config.logging.log_dir) {
        (Some(path), _) => {
            let file = std::fs::File::create(path)?;
            Some(tracing_appender::non_blocking(file))
        }
        (None, Some(dir)) => {
            let rolling = tracing_appender::rolling::daily(dir, "picocalc-kbd.log");
            Some(tracing_appender::non_blocking(rolling))
        }
        (None, None) => None,
    };

    let (file_layer, guard) = match appender {
        Some((writer, guard)) => {
            let layer = if args.log_format == "json" {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(path) = &args.log_file {
        info!("Logging to file: {}", path.display());
    } else if let Some(dir) = &config.logging.log_dir {
        info!("Logging to directory: {}", dir.display());
    }

    Ok(guard)
}
