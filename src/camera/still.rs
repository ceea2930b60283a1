//! A camera backed by a still image on disk.
//!
//! Stands in for capture hardware on machines without one: every grab
//! returns the decoded image at its own resolution.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{ImageError, RgbImage};

use super::device::{CameraDevice, Constraints, VideoStream};
use super::CameraError;
use crate::debug;

#[derive(Debug, Clone)]
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CameraDevice for StillImageCamera {
    async fn open(&self, constraints: &Constraints) -> Result<Box<dyn VideoStream>, CameraError> {
        let raster = image::open(&self.path)
            .map_err(|e| map_open_error(&self.path, e))?
            .to_rgb8();
        debug!(
            "camera";
            "{} opened ({}x{}, {:?} facing ignored)",
            self.path.display(),
            raster.width(),
            raster.height(),
            constraints.facing
        );
        Ok(Box::new(StillStream {
            raster: Some(raster),
        }))
    }
}

fn map_open_error(path: &Path, err: ImageError) -> CameraError {
    match err {
        ImageError::IoError(io) if io.kind() == ErrorKind::PermissionDenied => {
            CameraError::PermissionDenied(format!("{}: {io}", path.display()))
        }
        other => CameraError::DeviceUnavailable(format!("{}: {other}", path.display())),
    }
}

struct StillStream {
    raster: Option<RgbImage>,
}

impl VideoStream for StillStream {
    fn resolution(&self) -> (u32, u32) {
        self.raster.as_ref().map_or((0, 0), RgbImage::dimensions)
    }

    fn grab(&mut self) -> Result<RgbImage, CameraError> {
        self.raster.clone().ok_or(CameraError::NoActiveStream)
    }

    fn release(&mut self) {
        self.raster = None;
    }
}
