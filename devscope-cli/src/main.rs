mod commands;
mod config;
mod diagnostics;
mod error_handler;
mod render;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use devscope_core::HttpBackend;

use crate::commands::App;
use crate::config::Config;
use crate::diagnostics::Cli;

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    if let Some(url) = &cli.backend {
        debug!("Backend URL overridden on the command line: {}", url);
        config.backend.base_url = url.clone();
        config.validate()?;
    }

    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    info!("Using backend {}", config.backend.base_url);

    let backend = HttpBackend::new(&config.backend.base_url, config.request_timeout())
        .context("Failed to create backend client")?;

    let app = App::new(config, Arc::new(backend));
    app.run(cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = diagnostics::init_logging(&cli) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(error_handler::exit_code::INVALID_INPUT);
    }

    let context = format!("running {}", cli.command.name());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(error_handler::handle_error(&e, &context)),
    }
}
