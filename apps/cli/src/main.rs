use anyhow::Context;
use clap::Parser;
use depot_cli::{AppConfig, Cli, execute};
use depot_logger::Logger;
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = AppConfig::load(cli.config.as_deref())?;
    let _log = Logger::from_config(env!("CARGO_BIN_NAME"), &cfg.log).context("Failed to initialize logging")?;

    let storage = cfg.connect(cli.url.as_deref()).await?;

    let mut out = std::io::stdout().lock();
    execute(&storage, cli.command, cfg.storage.walk.concurrency, &mut out).await?;
    out.flush()?;
    Ok(())
}
