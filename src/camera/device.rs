//! Hardware seam.

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::CameraError;

/// Which camera to prefer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera (pointing at the mushroom).
    #[default]
    Environment,
    User,
}

/// Acquisition hints. Devices may ignore any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub facing: Facing,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// A camera that can be asked for a live stream.
///
/// `open` may suspend for as long as the user takes to grant permission.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(&self, constraints: &Constraints) -> Result<Box<dyn VideoStream>, CameraError>;
}

/// An acquired hardware stream. Dropping it must release the hardware.
pub trait VideoStream: Send {
    /// Native (width, height) of the stream.
    fn resolution(&self) -> (u32, u32);

    /// The current live frame.
    fn grab(&mut self) -> Result<RgbImage, CameraError>;

    /// Release the hardware. Calling it twice is harmless.
    fn release(&mut self);
}

/// Placeholder for sessions that never use a camera (upload mode).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

#[async_trait]
impl CameraDevice for NoCamera {
    async fn open(&self, _constraints: &Constraints) -> Result<Box<dyn VideoStream>, CameraError> {
        Err(CameraError::DeviceUnavailable("no camera device configured".into()))
    }
}
