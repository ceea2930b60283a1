//! Client configuration management for `mushguard.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/   # [client], [camera], [patch]
//! ├── error      # ConfigError, ConfigDiagnostics
//! ├── util       # config file discovery
//! └── mod.rs     # AppConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[client]`  | Page URL, anti-forgery field, JSON endpoints     |
//! | `[camera]`  | Acquisition hints (facing, preferred resolution) |
//! | `[patch]`   | Result/anchor selectors, stylesheet dependencies |
//!
//! The file is optional: without one every section takes its defaults.

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{CameraConfig, ClientConfig, PatchConfig};

use util::find_config_file;

use crate::cli::Cli;
use crate::dom::Selector;
use crate::{debug, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "mushguard.toml";

/// Root configuration structure representing mushguard.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path the config was read from, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub patch: PatchConfig,
}

impl AppConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// `--config` must exist when given; otherwise `mushguard.toml` is
    /// searched upward from the cwd and defaults apply if there is none.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let path = match &cli.config {
            Some(explicit) => Some(
                find_config_file(explicit, &cwd)
                    .ok_or_else(|| ConfigError::NotFound(explicit.clone()))?,
            ),
            None => find_config_file(Path::new(DEFAULT_CONFIG), &cwd),
        };

        let mut config = match &path {
            Some(path) => Self::from_path(path)?,
            None => {
                debug!("config"; "no {} found, using defaults", DEFAULT_CONFIG);
                Self::default()
            }
        };
        config.config_path = path;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// CLI flags override file values.
    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.url {
            self.client.page_url = url.clone();
        }
    }

    /// Parse configuration from a TOML string.
    #[cfg(test)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from a file, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Check every field that is parsed lazily elsewhere.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        match Url::parse(&self.client.page_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if let Err(e) = url.join(&self.client.analyze_path) {
                    diag.error("client.analyze_path", e.to_string());
                }
                if let Err(e) = url.join(&self.client.predict_path) {
                    diag.error("client.predict_path", e.to_string());
                }
            }
            Ok(url) => diag.error(
                "client.page_url",
                format!("unsupported scheme `{}`, expected http or https", url.scheme()),
            ),
            Err(e) => diag.error("client.page_url", format!("invalid URL: {e}")),
        }

        if self.client.csrf_field.trim().is_empty() {
            diag.error("client.csrf_field", "must not be empty");
        }

        if self.camera.width == 0 {
            diag.error("camera.width", "must be greater than zero");
        }
        if self.camera.height == 0 {
            diag.error("camera.height", "must be greater than zero");
        }

        if let Err(e) = Selector::parse(&self.patch.result_selector) {
            diag.error("patch.result_selector", e.to_string());
        }
        if let Err(e) = Selector::parse(&self.patch.anchor_selector) {
            diag.error("patch.anchor_selector", e.to_string());
        }
        for dep in &self.patch.stylesheets {
            if dep.script.trim().is_empty() || dep.href.trim().is_empty() {
                diag.error("patch.stylesheets", "`script` and `href` must not be empty");
            }
        }

        diag.into_result()
    }
}

/// Parse a config snippet in tests, panicking on error.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> AppConfig {
    AppConfig::from_str(content).expect("test config should parse")
}
