//! Command-line interface for blob-producer
//!
//! ```bash
//! blob-producer -c producer.properties -F data/messages.uper -t topic.Blocks
//! ```
//!
//! Exit status is 0 after a graceful shutdown or a successful `--config-check`
//! and 1 on any configuration, connection, or input file failure.

use anyhow::Context;
use blob_producer::{
    install_signal_handlers, logging, stream_file, Cli, CliOverrides, ConfigurationResolver,
    ShutdownFlag,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help goes to stdout and is not a failure.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // The logger is not available yet, so report straight to the console.
    if let Err(e) = logging::init(&cli.log_options()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = CliOverrides::from(&cli);

    if cli.config_check {
        let resolved = ConfigurationResolver::resolve(&overrides)
            .context("current configuration settings do not work")?;
        for line in resolved.dump() {
            println!("{line}");
        }
        return Ok(());
    }

    let shutdown = ShutdownFlag::new();
    install_signal_handlers(shutdown.clone()).context("Failed to install signal handlers")?;

    let resolved = ConfigurationResolver::resolve(&overrides)?;
    resolved.log_dump();
    stream_file(&resolved, shutdown).await?;
    Ok(())
}
