use anyhow::Result;
use clap::Parser;
use relayfs_daemon::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    relayfs_daemon::logging::init(cli.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relayd starting");
    cli.run().await
}
