//! Input mode switching.
//!
//! `ModeController` owns the visible control state and is the only caller
//! of `CameraSession::start`/`stop` outside the submit pipeline. Every
//! switch and every reset bumps the shared `Epoch`, which is how in-flight
//! submissions learn that their response has gone stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::camera::{CameraError, CameraSession, CameraState, Constraints};
use crate::notify::Notifier;
use crate::{debug, log};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Upload,
    Camera,
}

/// What the user can currently see and press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub mode: InputMode,
    /// Camera preview and start button shown.
    pub camera_visible: bool,
    /// Capture button usable (camera mode with a live stream).
    pub capture_enabled: bool,
    /// A submission is outstanding; submit controls are disabled.
    pub busy: bool,
}

/// Monotonic counter of user-visible resets.
#[derive(Debug, Default)]
pub struct Epoch(AtomicU64);

impl Epoch {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub struct ModeController {
    controls: Mutex<Controls>,
    camera: Arc<CameraSession>,
    constraints: Constraints,
    epoch: Arc<Epoch>,
    notifier: Arc<dyn Notifier>,
}

impl ModeController {
    pub fn new(
        camera: Arc<CameraSession>,
        constraints: Constraints,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            controls: Mutex::new(Controls::default()),
            camera,
            constraints,
            epoch: Arc::new(Epoch::default()),
            notifier,
        }
    }

    pub fn controls(&self) -> Controls {
        *self.controls.lock()
    }

    pub fn mode(&self) -> InputMode {
        self.controls.lock().mode
    }

    pub fn camera(&self) -> &Arc<CameraSession> {
        &self.camera
    }

    pub fn epoch(&self) -> &Arc<Epoch> {
        &self.epoch
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Leave camera mode: release the camera and disable capture.
    ///
    /// The epoch only moves when the mode actually changes, so a repeated
    /// click keeps an in-flight response.
    pub fn switch_to_upload(&self) {
        self.camera.stop();
        let mut controls = self.controls.lock();
        if controls.mode != InputMode::Upload {
            self.epoch.bump();
        }
        controls.mode = InputMode::Upload;
        controls.camera_visible = false;
        controls.capture_enabled = false;
        debug!("camera"; "switched to upload mode");
    }

    /// Reveal camera controls. Hardware is acquired by `start_camera`.
    pub fn switch_to_camera(&self) {
        let mut controls = self.controls.lock();
        if controls.mode != InputMode::Camera {
            self.epoch.bump();
        }
        controls.mode = InputMode::Camera;
        controls.camera_visible = true;
        controls.capture_enabled = self.camera.state() == CameraState::Active;
        debug!("camera"; "switched to camera mode");
    }

    /// Explicit user request to acquire the camera.
    ///
    /// Returns `Ok(false)` outside camera mode. Acquisition failures are
    /// alerted to the user and returned; mode switching stays usable.
    pub async fn start_camera(&self) -> Result<bool, CameraError> {
        if self.mode() != InputMode::Camera {
            debug!("camera"; "start ignored outside camera mode");
            return Ok(false);
        }

        let started = self.camera.start(&self.constraints).await;
        let active = self.camera.state() == CameraState::Active;
        {
            let mut controls = self.controls.lock();
            controls.capture_enabled = controls.mode == InputMode::Camera && active;
        }

        match started {
            Ok(()) => Ok(active),
            Err(e) => {
                log!("camera"; "{}", e);
                self.notifier.alert(&format!("Unable to access the camera\n{e}"));
                Err(e)
            }
        }
    }

    /// Stop the camera, discard the frame and re-enable submit controls.
    pub fn reset_camera(&self) {
        self.camera.stop();
        self.epoch.bump();
        let mut controls = self.controls.lock();
        controls.capture_enabled = false;
        controls.busy = false;
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.controls.lock().busy = busy;
    }
}
