//! Camera capture.
//!
//! # Module Structure
//!
//! - `device` - hardware seam (`CameraDevice`, `VideoStream`) and constraints
//! - `session` - `CameraSession` state machine owning the stream handle
//! - `still` - `StillImageCamera`, a device backed by an image file
//!
//! # State machine
//!
//! ```text
//!            start() ok             stop()
//!   Idle ──► Starting ──────► Active ─────► Idle
//!    ▲           │  start() err              ▲
//!    │           └──────────► Error ─────────┘
//!    └──────────── stop() (any state) ───────┘
//! ```

mod device;
mod session;
mod still;

use std::sync::Arc;

use thiserror::Error;

pub use device::{CameraDevice, Constraints, Facing, NoCamera, VideoStream};
pub use session::{CameraSession, CameraState};
pub use still::StillImageCamera;

use crate::utils::mime;

/// Camera acquisition and capture failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("no active camera stream")]
    NoActiveStream,

    #[error("failed to encode captured frame: {0}")]
    Encode(String),
}

/// One encoded still taken from a live stream.
///
/// Only `CameraSession::capture` creates frames, so a frame always comes
/// from a session that was `Active` at capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFrame {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl CaptureFrame {
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
        }
    }

    /// Encoded JPEG bytes.
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    pub fn mime(&self) -> &'static str {
        mime::types::JPEG
    }

    /// Source resolution (width, height).
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
