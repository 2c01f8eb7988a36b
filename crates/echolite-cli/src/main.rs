//! echolite CLI - Command-line controller for ECHONET Lite devices
//!
//! Discover devices, read and write their properties, and watch them for
//! changes from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use echolite_core::{EchonetObject, Property};
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

use config::CliConfig;

/// echolite - ECHONET Lite controller
#[derive(Parser)]
#[command(name = "echolite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ECHOLITE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Local bind address (overrides the config file)
    #[arg(short, long, global = true)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover devices and print what they expose
    Discover {
        /// Ask a single host instead of the multicast group
        #[arg(short = 'H', long)]
        host: Option<IpAddr>,

        /// Seconds to wait for multicast responses
        #[arg(short, long)]
        wait: Option<u64>,

        /// Print the state tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read properties of an object
    Get {
        /// Device address
        host: IpAddr,

        /// Object code, e.g. 0x013001
        #[arg(value_parser = parse_object)]
        object: EchonetObject,

        /// Property codes, e.g. 0x80
        #[arg(required = true, value_parser = parse_code)]
        codes: Vec<u8>,
    },

    /// Write properties of an object
    Set {
        /// Device address
        host: IpAddr,

        /// Object code, e.g. 0x013001
        #[arg(value_parser = parse_object)]
        object: EchonetObject,

        /// Assignments, e.g. 0x80=30
        #[arg(required = true, value_parser = parse_assignment)]
        properties: Vec<Property>,
    },

    /// Watch discovered devices and print changes until Ctrl+C
    Monitor {
        /// Watch a single host instead of everything on the network
        #[arg(short = 'H', long)]
        host: Option<IpAddr>,

        /// Seconds between property polls
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn parse_object(s: &str) -> std::result::Result<EchonetObject, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_code(s: &str) -> std::result::Result<u8, String> {
    commands::parse_code(s).map_err(|e| e.to_string())
}

fn parse_assignment(s: &str) -> std::result::Result<Property, String> {
    commands::parse_assignment(s).map_err(|e| format!("{:#}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.log_level, cli.json_logs)?;

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.client.bind = bind;
    }

    // Handle Ctrl+C
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(()).await;
        }
    });

    match cli.command {
        Commands::Discover { host, wait, json } => {
            if !json {
                println!(
                    "{} Discovering via {}",
                    "echolite".cyan().bold(),
                    host.unwrap_or_else(|| config.client.discovery_target())
                );
            }
            commands::discover(&config, host, wait, json).await?;
        }

        Commands::Get {
            host,
            object,
            codes,
        } => {
            println!(
                "{} Reading {} {}",
                "echolite".cyan().bold(),
                host,
                object.to_string().yellow()
            );
            commands::get(&config, host, object, &codes).await?;
        }

        Commands::Set {
            host,
            object,
            properties,
        } => {
            println!(
                "{} Writing {} {}",
                "echolite".cyan().bold(),
                host,
                object.to_string().yellow()
            );
            commands::set(&config, host, object, properties).await?;
        }

        Commands::Monitor { host, interval } => {
            commands::monitor(&config, host, interval, &mut shutdown_rx).await?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get() {
        let cli = Cli::try_parse_from(["echolite", "get", "192.168.1.20", "01:30:01", "0x80", "b0"]).unwrap();
        match cli.command {
            Commands::Get { host, object, codes } => {
                assert_eq!(host, "192.168.1.20".parse::<IpAddr>().unwrap());
                assert_eq!(object, EchonetObject::new(0x01, 0x30, 0x01));
                assert_eq!(codes, vec![0x80, 0xB0]);
            }
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_parse_set_requires_assignment() {
        assert!(Cli::try_parse_from(["echolite", "set", "192.168.1.20", "013001"]).is_err());
        assert!(Cli::try_parse_from(["echolite", "set", "192.168.1.20", "013001", "0x80"]).is_err());

        let cli = Cli::try_parse_from(["echolite", "set", "192.168.1.20", "013001", "0x80=30"]).unwrap();
        assert!(matches!(cli.command, Commands::Set { .. }));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "echolite",
            "--log-level",
            "debug",
            "--json-logs",
            "discover",
            "--wait",
            "5",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(cli.json_logs);
        assert!(matches!(
            cli.command,
            Commands::Discover {
                host: None,
                wait: Some(5),
                json: true
            }
        ));
    }
}
