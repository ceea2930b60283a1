//! MIME type detection for uploaded images.

use std::path::Path;

/// MIME constants used on the submission wire.
pub mod types {
    pub const JPEG: &str = "image/jpeg";
    pub const PNG: &str = "image/png";
    pub const WEBP: &str = "image/webp";
    pub const GIF: &str = "image/gif";
    pub const BMP: &str = "image/bmp";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Guess an image MIME type from the file extension (case-insensitive).
pub fn image_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg" | "jfif") => types::JPEG,
        Some("png") => types::PNG,
        Some("webp") => types::WEBP,
        Some("gif") => types::GIF,
        Some("bmp") => types::BMP,
        _ => types::OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_from_path() {
        assert_eq!(image_from_path(Path::new("a/b/cap.JPG")), types::JPEG);
        assert_eq!(image_from_path(Path::new("shroom.webp")), types::WEBP);
        assert_eq!(image_from_path(Path::new("noext")), types::OCTET_STREAM);
    }
}
