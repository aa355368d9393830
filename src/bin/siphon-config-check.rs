//! # Siphon Configuration Check
//!
//! Loads a configuration file the same way the daemon does (file, then
//! `SIPHON__` overrides, then the legacy flat variables) and reports whether
//! it would start. Exits with status 1 on any configuration error.

use clap::Parser;
use orchestrator_siphon::config::ConfigManager;
use orchestrator_siphon::models::units::display_ether;
use orchestrator_siphon::orchestration::SiphonSettings;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "siphon-config-check")]
#[command(about = "Validate an orchestrator siphon configuration file")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (TOML, INI, JSON or YAML)
    #[arg(default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the resolved configuration with secrets masked
    #[arg(long)]
    print: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    match check(&cli) {
        Ok(()) => {
            info!("Configuration check completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration check failed: {}", e);
            eprintln!("❌ {e}");
            process::exit(1);
        }
    }
}

fn check(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConfigManager::load_from_file(&cli.config)?;
    let config = manager.config();
    let settings = SiphonSettings::from_config(config)?;

    println!("✅ Configuration loaded from {}", manager.config_path().display());
    for orchestrator in &config.orchestrators {
        println!(
            "   {} -> ETH {} / LPT {}",
            orchestrator.source_address,
            orchestrator.receiver_address_eth,
            orchestrator.receiver_address_lpt
        );
    }
    println!(
        "   LPT threshold {} / ETH threshold {} / reserve {}",
        display_ether(settings.thresholds.lpt_threshold, 2),
        display_ether(settings.thresholds.eth_threshold, 4),
        display_ether(settings.thresholds.eth_minval, 4)
    );
    println!(
        "   round cache {:.0}s, idle wait {:.0}s",
        settings.ttls.round.as_secs_f64(),
        settings.idle_wait.as_secs_f64()
    );

    if cli.print {
        println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
    }

    Ok(())
}
