//! Wiring shared by the submitting commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use url::Url;

use super::args::PageArgs;
use crate::activate::{Activator, HttpScriptHost, ScriptLoadRegistry};
use crate::camera::{CameraDevice, CameraSession};
use crate::config::AppConfig;
use crate::dom::{Document, Selector};
use crate::mode::ModeController;
use crate::notify::TerminalNotifier;
use crate::patch::{PatchReport, ResultPatcher};
use crate::pipeline::{CaptureSubmitPipeline, HttpTransport};
use crate::{debug, log};

/// HTTP client shared by page loads, submissions and script fetches.
///
/// Cookies are kept so the anti-forgery cookie set by the page GET is sent
/// back with the submission.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .cookie_store(true)
        .user_agent(concat!("mushguard/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Everything one submitting command needs.
pub struct Session {
    pub controller: Arc<ModeController>,
    pub pipeline: CaptureSubmitPipeline,
}

impl Session {
    pub async fn open(
        config: &AppConfig,
        page: &PageArgs,
        client: &reqwest::Client,
        device: Arc<dyn CameraDevice>,
    ) -> Result<Self> {
        let page_url = config.client.page_url()?;
        let document = load_page(client, &page_url, page.page.as_deref()).await?;

        let registry = Arc::new(ScriptLoadRegistry::new());
        let activator = Activator::new(
            registry,
            Arc::new(HttpScriptHost::new(client.clone())),
            page_url.clone(),
            config.patch.stylesheets.clone(),
        );
        let patcher = ResultPatcher::new(
            Selector::parse(&config.patch.result_selector)?,
            Selector::parse(&config.patch.anchor_selector)?,
            activator,
        );

        let controller = Arc::new(ModeController::new(
            Arc::new(CameraSession::new(device)),
            config.camera.constraints(),
            Arc::new(TerminalNotifier),
        ));
        let pipeline = CaptureSubmitPipeline::new(
            page_url,
            config.client.csrf_field.clone(),
            Arc::new(Mutex::new(document)),
            Arc::new(HttpTransport::new(client.clone())),
            patcher,
            Arc::clone(&controller),
        );

        Ok(Self {
            controller,
            pipeline,
        })
    }

    /// Print the new result text and write the page if asked to.
    pub fn finish(&self, report: &PatchReport, out: Option<&Path>) -> Result<()> {
        let doc = self.pipeline.document().lock();
        let text = doc.text_content(report.node);
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        println!("{text}");

        if let Some(out) = out {
            fs::write(out, doc.to_html())
                .with_context(|| format!("Failed to write {}", out.display()))?;
            log!("patch"; "page written to {}", out.display());
        }
        Ok(())
    }
}

/// Read the live page from disk or fetch it from `url`.
async fn load_page(client: &reqwest::Client, url: &Url, saved: Option<&Path>) -> Result<Document> {
    let html = match saved {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read page {}", path.display()))?,
        None => {
            debug!("submit"; "GET {}", url);
            let response = client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("Failed to load {url}"))?
                .error_for_status()
                .with_context(|| format!("Failed to load {url}"))?;
            response.text().await.context("Failed to read page body")?
        }
    };
    Ok(Document::parse(&html)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::NoCamera;
    use crate::testing::StubServer;
    use tempfile::TempDir;

    const PAGE: &str = r#"<html><body><form id="analyze-form"><input type="hidden" name="csrfmiddlewaretoken" value="abc"></form><div class="result">old</div></body></html>"#;

    #[tokio::test]
    async fn test_session_fetches_live_page() {
        let page = StubServer::respond(200, "text/html", PAGE);

        let mut config = AppConfig::default();
        config.client.page_url = page.url("/analyze/").to_string();
        let client = http_client().unwrap();
        let args = PageArgs {
            page: None,
            out: None,
        };
        let session = Session::open(&config, &args, &client, Arc::new(NoCamera))
            .await
            .unwrap();

        assert_eq!(page.requests()[0].method, "GET");
        assert_eq!(
            session.pipeline.document().lock().csrf_token("csrfmiddlewaretoken"),
            Some("abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_saved_page_and_output_file() {
        let dir = TempDir::new().unwrap();
        let saved = dir.path().join("page.html");
        let out = dir.path().join("patched.html");
        fs::write(&saved, PAGE).unwrap();

        let server = StubServer::respond(200, "text/html", r#"<div class="result">EDIBLE</div>"#);
        let mut config = AppConfig::default();
        config.client.page_url = server.url("/analyze/").to_string();
        let client = http_client().unwrap();
        let args = PageArgs {
            page: Some(saved),
            out: Some(out.clone()),
        };

        let session = Session::open(&config, &args, &client, Arc::new(NoCamera))
            .await
            .unwrap();
        let upload = crate::pipeline::UploadedImage::from_bytes("a.jpg", vec![1], "image/jpeg");
        let outcome = session.pipeline.submit_upload(upload).await.unwrap();
        let crate::pipeline::SubmitOutcome::Patched(report) = outcome else {
            panic!("expected patch");
        };
        session.finish(&report, args.out.as_deref()).unwrap();

        let written = fs::read_to_string(&out).unwrap();
        assert!(written.contains(r#"<div class="result">EDIBLE</div>"#));
        assert!(!written.contains("old"));
    }
}
