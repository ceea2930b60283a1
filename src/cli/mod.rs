//! Command-line interface module.

mod analyze;
mod args;
mod common;
mod submit;

pub use args::{Cli, Commands};

use anyhow::{Context, Result};

use crate::config::AppConfig;

/// Run one command on a single-threaded runtime.
pub fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        match &cli.command {
            Commands::Upload { image, page } => submit::upload(config, image, page).await,
            Commands::Capture { device, page } => submit::capture(config, device, page).await,
            Commands::Analyze {
                image,
                predict,
                json,
            } => analyze::analyze(config, image, *predict, *json).await,
        }
    })
}
