//! Configuration sections of `mushguard.toml`.

mod camera;
mod client;
mod patch;

pub use camera::CameraConfig;
pub use client::ClientConfig;
pub use patch::PatchConfig;
