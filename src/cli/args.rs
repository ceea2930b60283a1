//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// MushGuard capture, submit and patch client
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: mushguard.toml, searched upward)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Page URL submissions are posted to (overrides `[client] page_url`)
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Submit an image file from disk (upload mode)
    #[command(visible_alias = "u")]
    Upload {
        /// Image to submit
        #[arg(value_hint = clap::ValueHint::FilePath)]
        image: PathBuf,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Capture a frame from a camera device and submit it (camera mode)
    #[command(visible_alias = "c")]
    Capture {
        /// Still image served as the live camera stream
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        device: PathBuf,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Classify an image through the JSON endpoints
    #[command(visible_alias = "a")]
    Analyze {
        /// Image to classify
        #[arg(value_hint = clap::ValueHint::FilePath)]
        image: PathBuf,

        /// Use the `/predict/` envelope endpoint instead of `/analyze/`
        #[arg(short, long)]
        predict: bool,

        /// Print the decoded classification as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Where the live page comes from and where the patched page goes.
#[derive(clap::Args, Debug, Clone)]
pub struct PageArgs {
    /// Start from a saved page instead of fetching the page URL
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub page: Option<PathBuf>,

    /// Write the patched page here
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub out: Option<PathBuf>,
}
