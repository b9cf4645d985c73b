//! `app-storage` - inspect, edit and watch persisted key-value domains.

use std::{error::Error, io, process};

use clap::Parser;
use tracing::{debug, warn};

use app_storage::{
    cli::{
        Cli, CliError, CliService, Command,
        formatting::{format_description, format_error},
    },
    config::{ConfigPaths, StorageConfig},
    tracing_config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    tracing_config::init(&config.general)?;
    debug!(command = ?cli.command, "starting");

    if let Err(e) = run(cli, &config).await {
        exit_with(&e);
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<StorageConfig, CliError> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => ConfigPaths::main_config()?,
    };

    Ok(StorageConfig::load(&path)?)
}

async fn run(cli: Cli, config: &StorageConfig) -> Result<(), CliError> {
    let service = CliService::from_config(config, cli.domain.as_deref())?;

    match &cli.command {
        Command::Watch { key } => {
            eprintln!(
                "{}",
                format_description(&format!(
                    "Watching '{key}' in {}. Press Ctrl+C to stop",
                    service.path().display()
                ))
            );

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "cannot listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
            };

            service.watch(key, shutdown, &mut io::stdout()).await
        }
        command => {
            let output = service.execute(command)?;
            if !output.trim().is_empty() {
                println!("{output}");
            }
            Ok(())
        }
    }
}

fn exit_with(error: &CliError) -> ! {
    eprintln!("{}", format_error(&error.to_string()));
    process::exit(1);
}
