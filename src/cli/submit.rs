//! `upload` and `capture` commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use super::args::PageArgs;
use super::common::{Session, http_client};
use crate::camera::{NoCamera, StillImageCamera};
use crate::config::AppConfig;
use crate::logger::status_success;
use crate::pipeline::{SubmitOutcome, UploadedImage};
use crate::log;

/// Upload mode: post an image file and patch the page with the response.
pub async fn upload(config: &AppConfig, image: &Path, page: &PageArgs) -> Result<()> {
    let upload = UploadedImage::from_path(image)
        .with_context(|| format!("Failed to read {}", image.display()))?;
    if upload.is_empty() {
        bail!("{} is empty", image.display());
    }

    let client = http_client()?;
    let session = Session::open(config, page, &client, Arc::new(NoCamera)).await?;
    session.controller.switch_to_upload();

    log!("submit"; "uploading {}", upload.file_name());
    let outcome = session.pipeline.submit_upload(upload).await?;
    report(&session, outcome, page)
}

/// Camera mode: start the device, capture one frame and submit it.
pub async fn capture(config: &AppConfig, device: &Path, page: &PageArgs) -> Result<()> {
    let client = http_client()?;
    let camera = Arc::new(StillImageCamera::new(device));
    let session = Session::open(config, page, &client, camera).await?;

    session.controller.switch_to_camera();
    session.controller.start_camera().await?;
    let frame = session.controller.camera().capture()?;
    let (width, height) = frame.resolution();
    log!("camera"; "captured {}x{} ({} bytes)", width, height, frame.len());

    let outcome = session.pipeline.submit_capture().await?;
    report(&session, outcome, page)
}

fn report(session: &Session, outcome: SubmitOutcome, page: &PageArgs) -> Result<()> {
    match outcome {
        SubmitOutcome::Patched(patched) => {
            let loaded = patched.activation.external.len();
            let failed = patched.activation.failures.len();
            session.finish(&patched, page.out.as_deref())?;
            status_success(&format!(
                "result patched ({loaded} script(s) loaded, {failed} failed)"
            ));
            Ok(())
        }
        SubmitOutcome::Discarded => bail!("response was discarded after a reset"),
    }
}
