//! Script execution seam.
//!
//! The patcher never executes anything itself: external scripts go through
//! `ScriptHost::load` (behind the registry) and inline scripts through
//! `ScriptHost::run_inline`. Tests swap in a fake host to observe ordering.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::debug;

/// Non-fatal failure of one script or stylesheet resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptLoadError {
    #[error("failed to fetch `{url}`: {reason}")]
    Fetch { url: String, reason: String },

    #[error("`{url}` answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("inline script failed: {0}")]
    Inline(String),

    /// The task driving the load was dropped before it finished.
    #[error("load of `{0}` was abandoned before completing")]
    Abandoned(String),
}

/// Executes scripts on behalf of the activation loader.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Fetch and execute an external script. Completes once it has run.
    async fn load(&self, url: &Url) -> Result<(), ScriptLoadError>;

    /// Execute inline script source synchronously.
    fn run_inline(&self, source: &str) -> Result<(), ScriptLoadError>;
}

/// Host for headless use: external scripts are fetched over HTTP, inline
/// sources are only traced.
#[derive(Debug, Clone)]
pub struct HttpScriptHost {
    client: reqwest::Client,
}

impl HttpScriptHost {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScriptHost for HttpScriptHost {
    async fn load(&self, url: &Url) -> Result<(), ScriptLoadError> {
        let fetch_err = |e: reqwest::Error| ScriptLoadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url.clone()).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScriptLoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(fetch_err)?;
        debug!("activate"; "loaded {} ({} bytes)", url, body.len());
        Ok(())
    }

    fn run_inline(&self, source: &str) -> Result<(), ScriptLoadError> {
        let first_line = source.trim().lines().next().unwrap_or_default();
        debug!("activate"; "inline script: {}", first_line);
        Ok(())
    }
}
