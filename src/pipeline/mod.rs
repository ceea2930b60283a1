//! Capture/upload submission.
//!
//! `CaptureSubmitPipeline` posts one image at a time to the page URL, hands
//! a successful response to the `ResultPatcher` and resets the camera after
//! every response, successful or not.
//!
//! # Module Structure
//!
//! - `request` - `SubmissionRequest`, `ImagePart`, `UploadedImage`
//! - `transport` - `Transport` seam and the `reqwest` implementation
//!
//! # Stale responses
//!
//! Each submission records the `ModeController` epoch when it starts. If
//! the user switches mode or resets the camera before the response arrives,
//! the response is dropped without touching the document and the call
//! returns `SubmitOutcome::Discarded`.

mod request;
mod transport;


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use thiserror::Error;
use url::Url;

pub use request::{ImagePart, SubmissionRequest, UploadedImage};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
pub(crate) use transport::image_form;

use crate::camera::CaptureFrame;
use crate::dom::Document;
use crate::mode::ModeController;
use crate::patch::{PatchError, PatchReport, ResultPatcher};
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no captured image to submit")]
    NoCaptureAvailable,

    #[error("a submission is already in progress")]
    AlreadySubmitting,

    #[error("analysis request failed: {0}")]
    NetworkFailure(String),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Patched(PatchReport),
    /// The response arrived after a mode switch or reset and was dropped.
    Discarded,
}

pub struct CaptureSubmitPipeline {
    page_url: Url,
    csrf_field: String,
    document: Arc<Mutex<Document>>,
    transport: Arc<dyn Transport>,
    patcher: ResultPatcher,
    controller: Arc<ModeController>,
    in_flight: AtomicBool,
}

impl CaptureSubmitPipeline {
    pub fn new(
        page_url: Url,
        csrf_field: impl Into<String>,
        document: Arc<Mutex<Document>>,
        transport: Arc<dyn Transport>,
        patcher: ResultPatcher,
        controller: Arc<ModeController>,
    ) -> Self {
        Self {
            page_url,
            csrf_field: csrf_field.into(),
            document,
            transport,
            patcher,
            controller,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn document(&self) -> &Arc<Mutex<Document>> {
        &self.document
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submit the frame retained by the camera session, if any.
    ///
    /// The frame is only taken once the single-flight slot is held, so a
    /// rejected call leaves it in place.
    pub async fn submit_capture(&self) -> Result<SubmitOutcome, SubmitError> {
        let guard = InFlight::acquire(&self.in_flight, &self.controller)?;
        let frame = self.controller.camera().take_frame();
        self.send_frame(guard, frame).await
    }

    /// Submit a camera frame.
    pub async fn submit(&self, frame: Option<CaptureFrame>) -> Result<SubmitOutcome, SubmitError> {
        let guard = InFlight::acquire(&self.in_flight, &self.controller)?;
        self.send_frame(guard, frame).await
    }

    /// Submit an image chosen in upload mode.
    pub async fn submit_upload(&self, image: UploadedImage) -> Result<SubmitOutcome, SubmitError> {
        let guard = InFlight::acquire(&self.in_flight, &self.controller)?;
        self.send(guard, image.into_part()).await
    }

    async fn send_frame(
        &self,
        guard: InFlight<'_>,
        frame: Option<CaptureFrame>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let Some(frame) = frame else {
            drop(guard);
            self.controller
                .notifier()
                .alert("Please capture a photo first");
            return Err(SubmitError::NoCaptureAvailable);
        };
        self.send(guard, ImagePart::from(&frame)).await
    }

    async fn send(&self, _guard: InFlight<'_>, image: ImagePart) -> Result<SubmitOutcome, SubmitError> {
        let epoch = self.controller.epoch().current();

        let mut request = SubmissionRequest::new(self.page_url.clone(), image);
        if let Some(token) = self.document.lock().csrf_token(&self.csrf_field) {
            request = request.with_csrf(self.csrf_field.clone(), token);
        }

        log!("submit"; "sending {} ({} bytes)", request.image.file_name, request.image.data.len());
        let sent = self.transport.post(request).await;

        if self.controller.epoch().current() != epoch {
            log!("submit"; "response arrived after a reset; discarded");
            return Ok(SubmitOutcome::Discarded);
        }

        let fragment = match sent {
            Ok(response) if response.is_success() => response.body,
            Ok(response) => {
                return Err(self.network_failure(format!("server answered HTTP {}", response.status)));
            }
            Err(e) => return Err(self.network_failure(e.to_string())),
        };

        let patched = self.patcher.patch(&self.document, &fragment).await;
        self.controller.reset_camera();

        let report = patched?;
        debug!("submit"; "result patched ({:?})", report.op);
        Ok(SubmitOutcome::Patched(report))
    }

    /// Alert the user, reset the camera and build the error.
    fn network_failure(&self, detail: String) -> SubmitError {
        log!("error"; "{}", detail);
        self.controller
            .notifier()
            .alert(&format!("Error analyzing image. Please try again.\n{detail}"));
        self.controller.reset_camera();
        SubmitError::NetworkFailure(detail)
    }
}

/// Single-flight flag. Cleared (with the busy control) on every exit path.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    controller: &'a ModeController,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, controller: &'a ModeController) -> Result<Self, SubmitError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("submit"; "rejected: already submitting");
            return Err(SubmitError::AlreadySubmitting);
        }
        controller.set_busy(true);
        Ok(Self { flag, controller })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.controller.set_busy(false);
        self.flag.store(false, Ordering::SeqCst);
    }
}
