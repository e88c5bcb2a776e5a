//! Command line of `relayd`.

use crate::daemon::{self, Daemon};
use crate::logging::LogFormat;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use relayfs_select::Direction;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DEFAULT_CONFIG: &str = "/etc/relayfs/relayd.toml";

/// relayfs daemon.
#[derive(Debug, Parser)]
#[command(name = "relayd")]
#[command(about = "relayfs node selection and replication daemon", long_about = None)]
pub struct Cli {
    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true, env = "RELAYD_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Transfer direction for a selection dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransferDirection {
    /// Client upload.
    Up,
    /// Client download.
    Down,
}

impl From<TransferDirection> for Direction {
    fn from(d: TransferDirection) -> Self {
        match d {
            TransferDirection::Up => Direction::Receiving,
            TransferDirection::Down => Direction::Sending,
        }
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduler until interrupted. SIGHUP reloads the configuration.
    Serve {
        /// Configuration file.
        #[arg(short, long, default_value = DEFAULT_CONFIG, env = "RELAYD_CONFIG")]
        config: PathBuf,
    },
    /// Print the node (and volume) that would serve a transfer.
    Select {
        /// Configuration file.
        #[arg(short, long, default_value = DEFAULT_CONFIG, env = "RELAYD_CONFIG")]
        config: PathBuf,
        /// Virtual path of the file.
        #[arg(short, long)]
        path: String,
        /// Transfer direction.
        #[arg(short, long, value_enum, default_value_t = TransferDirection::Up)]
        direction: TransferDirection,
    },
    /// Build every chain and validate the configuration.
    Check {
        /// Configuration file.
        #[arg(short, long, default_value = DEFAULT_CONFIG, env = "RELAYD_CONFIG")]
        config: PathBuf,
    },
}

impl Cli {
    /// Execute the parsed command.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve { config } => serve(config).await,
            Command::Select {
                config,
                path,
                direction,
            } => select(config, &path, direction).await,
            Command::Check { config } => check(config),
        }
    }
}

async fn serve(config_path: PathBuf) -> Result<()> {
    let config = daemon::load_config(&config_path)?;
    let daemon = Daemon::new(&config_path, &config)?;
    daemon.seed(&config.seed_jobs).await;
    daemon.mirror_existing().await?;

    let shutdown = CancellationToken::new();
    let ctrl_c = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupt received, shutting down"),
                Err(e) => error!(error = %e, "cannot listen for Ctrl-C"),
            }
            shutdown.cancel();
        })
    };

    let result = daemon.run(shutdown).await;
    ctrl_c.abort();
    result
}

async fn select(config_path: PathBuf, path: &str, direction: TransferDirection) -> Result<()> {
    let config = daemon::load_config(&config_path)?;
    let daemon = Daemon::new(&config_path, &config)?;
    let placement = daemon.select(path, direction.into()).await?;
    match placement.volume {
        Some(volume) => println!(
            "{}\t{}\t{}",
            placement.node.name,
            volume.name,
            volume.root.display()
        ),
        None => println!("{}", placement.node.name),
    }
    Ok(())
}

fn check(config_path: PathBuf) -> Result<()> {
    let config = daemon::load_config(&config_path)?;
    for chain in daemon::check(&config)? {
        let filters = if chain.filters.is_empty() {
            "(empty)".to_string()
        } else {
            chain.filters.join(" -> ")
        };
        println!("{}: {}", chain.source, filters);
    }
    println!("{}: ok", config_path.display());
    Ok(())
}
