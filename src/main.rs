//! MushGuard - capture, submit and patch client for a mushroom classifier.

mod activate;
mod camera;
mod classify;
mod cli;
mod config;
mod dom;
mod logger;
mod mode;
mod notify;
mod patch;
mod pipeline;
#[cfg(test)]
mod testing;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::AppConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    logger::set_verbose(cli.verbose);

    let config = AppConfig::load(&cli)?;
    cli::run(&cli, &config)
}
