//! Submission payloads.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use url::Url;

use crate::camera::CaptureFrame;
use crate::utils::mime;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Header marking a request as script-initiated.
pub const REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

/// File name given to camera captures.
pub const CAPTURE_FILE_NAME: &str = "capture.jpg";

/// The binary `image` part of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub data: Arc<[u8]>,
    pub file_name: String,
    pub mime: &'static str,
}

impl From<&CaptureFrame> for ImagePart {
    fn from(frame: &CaptureFrame) -> Self {
        Self {
            data: Arc::clone(frame.data()),
            file_name: CAPTURE_FILE_NAME.to_string(),
            mime: frame.mime(),
        }
    }
}

/// An image picked from disk in upload mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    part: ImagePart,
}

impl UploadedImage {
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let data = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::from_bytes(file_name, data, mime::image_from_path(path)))
    }

    pub fn from_bytes(file_name: impl Into<String>, data: Vec<u8>, mime: &'static str) -> Self {
        Self {
            part: ImagePart {
                data: data.into(),
                file_name: file_name.into(),
                mime,
            },
        }
    }

    pub fn file_name(&self) -> &str {
        &self.part.file_name
    }

    pub fn len(&self) -> usize {
        self.part.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.part.data.is_empty()
    }

    pub(crate) fn into_part(self) -> ImagePart {
        self.part
    }
}

/// One POST to the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub url: Url,
    pub image: ImagePart,
    /// Anti-forgery `(field, token)`, when the page carries one.
    pub csrf: Option<(String, String)>,
}

impl SubmissionRequest {
    pub fn new(url: Url, image: ImagePart) -> Self {
        Self {
            url,
            image,
            csrf: None,
        }
    }

    pub fn with_csrf(mut self, field: impl Into<String>, token: impl Into<String>) -> Self {
        self.csrf = Some((field.into(), token.into()));
        self
    }

    pub fn headers(&self) -> [(&'static str, &'static str); 1] {
        [REQUESTED_WITH]
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_upload_from_path_keeps_name_and_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Chanterelle.PNG");
        fs::write(&path, b"\x89PNG fake").unwrap();

        let upload = UploadedImage::from_path(&path).unwrap();

        assert_eq!(upload.file_name(), "Chanterelle.PNG");
        assert_eq!(upload.len(), 9);
        let part = upload.into_part();
        assert_eq!(part.mime, mime::types::PNG);
    }

    #[test]
    fn test_capture_part_is_named_jpeg() {
        let frame = CaptureFrame::new(vec![0xFF, 0xD8, 0xFF], 4, 3);
        let part = ImagePart::from(&frame);

        assert_eq!(part.file_name, CAPTURE_FILE_NAME);
        assert_eq!(part.mime, mime::types::JPEG);
        assert_eq!(&part.data[..], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_request_is_marked_script_initiated() {
        let frame = CaptureFrame::new(vec![1], 1, 1);
        let request = SubmissionRequest::new(
            Url::parse("http://shrooms.test/analyze/").unwrap(),
            ImagePart::from(&frame),
        )
        .with_csrf("csrfmiddlewaretoken", "tok");

        assert_eq!(request.headers(), [("X-Requested-With", "XMLHttpRequest")]);
        assert_eq!(
            request.csrf,
            Some(("csrfmiddlewaretoken".to_string(), "tok".to_string()))
        );
    }
}
