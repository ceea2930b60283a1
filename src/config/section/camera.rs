//! `[camera]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [camera]
//! facing = "environment"   # or "user"
//! width = 1280             # preferred width, a hint only
//! height = 720             # preferred height, a hint only
//! ```

use serde::{Deserialize, Serialize};

use crate::camera::{Constraints, Facing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let constraints = Constraints::default();
        Self {
            facing: constraints.facing,
            width: constraints.ideal_width,
            height: constraints.ideal_height,
        }
    }
}

impl CameraConfig {
    pub fn constraints(&self) -> Constraints {
        Constraints {
            facing: self.facing,
            ideal_width: self.width,
            ideal_height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::camera::{Constraints, Facing};
    use crate::config::test_parse_config;

    #[test]
    fn test_camera_config() {
        let config = test_parse_config("[camera]\nfacing = \"user\"\nwidth = 640");

        let constraints = config.camera.constraints();
        assert_eq!(constraints.facing, Facing::User);
        assert_eq!(constraints.ideal_width, 640);
        assert_eq!(constraints.ideal_height, 720);
    }

    #[test]
    fn test_camera_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.camera.constraints(), Constraints::default());
    }
}
