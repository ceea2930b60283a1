//! Camera session: sole owner of the hardware stream and the last frame.

use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use parking_lot::Mutex;

use super::device::{CameraDevice, Constraints, VideoStream};
use super::{CameraError, CaptureFrame};
use crate::debug;

/// JPEG quality for captured frames (0.95 on a 0..1 scale).
pub const JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Starting,
    Active,
    Error,
}

struct Inner {
    state: CameraState,
    stream: Option<Box<dyn VideoStream>>,
    frame: Option<CaptureFrame>,
    /// Bumped by every `start` and `stop`; a pending acquisition whose
    /// generation is stale hands its stream straight back.
    generation: u64,
}

pub struct CameraSession {
    device: Arc<dyn CameraDevice>,
    inner: Mutex<Inner>,
}

impl CameraSession {
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self {
            device,
            inner: Mutex::new(Inner {
                state: CameraState::Idle,
                stream: None,
                frame: None,
                generation: 0,
            }),
        }
    }

    pub fn state(&self) -> CameraState {
        self.inner.lock().state
    }

    /// Acquire the camera.
    ///
    /// Accepted from `Idle` (and `Error`, as a retry). While `Starting` or
    /// `Active` this is a no-op, so repeated calls never hold two streams.
    pub async fn start(&self, constraints: &Constraints) -> Result<(), CameraError> {
        let generation = {
            let mut inner = self.inner.lock();
            if matches!(inner.state, CameraState::Starting | CameraState::Active) {
                debug!("camera"; "start ignored: already {:?}", inner.state);
                return Ok(());
            }
            inner.state = CameraState::Starting;
            inner.generation += 1;
            inner.generation
        };

        let acquired = self.device.open(constraints).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            if let Ok(mut stream) = acquired {
                stream.release();
            }
            debug!("camera"; "stopped while starting; stream released");
            return Ok(());
        }

        match acquired {
            Ok(stream) => {
                let (w, h) = stream.resolution();
                debug!("camera"; "active at {}x{}", w, h);
                inner.stream = Some(stream);
                inner.state = CameraState::Active;
                Ok(())
            }
            Err(e) => {
                inner.state = CameraState::Error;
                Err(e)
            }
        }
    }

    /// Release the stream (if any), drop the held frame and return to `Idle`.
    ///
    /// Safe from every state; from `Idle` it changes nothing.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CameraState::Idle && inner.stream.is_none() && inner.frame.is_none() {
            return;
        }
        if let Some(mut stream) = inner.stream.take() {
            stream.release();
            debug!("camera"; "stream released");
        }
        inner.frame = None;
        inner.generation += 1;
        inner.state = CameraState::Idle;
    }

    /// Encode the current live frame as JPEG at native resolution.
    ///
    /// The frame is also retained until `take_frame` or `stop`.
    pub fn capture(&self) -> Result<CaptureFrame, CameraError> {
        let mut inner = self.inner.lock();
        if inner.state != CameraState::Active {
            return Err(CameraError::NoActiveStream);
        }
        let stream = inner.stream.as_mut().ok_or(CameraError::NoActiveStream)?;

        let (width, height) = stream.resolution();
        let live = stream.grab()?;
        let raster = if live.dimensions() == (width, height) {
            live
        } else {
            imageops::resize(&live, width, height, FilterType::Triangle)
        };

        let frame = CaptureFrame::new(encode_jpeg(&raster)?, width, height);
        debug!("camera"; "captured {}x{} ({} bytes)", width, height, frame.len());
        inner.frame = Some(frame.clone());
        Ok(frame)
    }

    /// Hand over the retained frame; it can be taken only once.
    pub fn take_frame(&self) -> Option<CaptureFrame> {
        self.inner.lock().frame.take()
    }

    pub fn has_frame(&self) -> bool {
        self.inner.lock().frame.is_some()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn encode_jpeg(raster: &RgbImage) -> Result<Vec<u8>, CameraError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(raster)
        .map_err(|e| CameraError::Encode(e.to_string()))?;
    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================
