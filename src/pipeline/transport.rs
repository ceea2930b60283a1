//! Network seam for submissions.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use thiserror::Error;

use super::request::{IMAGE_FIELD, ImagePart, SubmissionRequest};
use crate::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("could not build request to `{url}`: {reason}")]
    Build { url: String, reason: String },

    #[error("request to `{url}` failed: {reason}")]
    Send { url: String, reason: String },

    #[error("reading response from `{url}` failed: {reason}")]
    Body { url: String, reason: String },
}

/// Sends one submission. Never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: SubmissionRequest) -> Result<TransportResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: SubmissionRequest) -> Result<TransportResponse, TransportError> {
        let url = request.url.to_string();
        let headers = request.headers();
        let SubmissionRequest { url: target, image, csrf } = request;

        let size = image.data.len();
        let mut form = image_form(image).map_err(|e| TransportError::Build {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if let Some((field, token)) = csrf {
            form = form.text(field, token);
        }

        let mut builder = self.client.post(target);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        debug!("submit"; "POST {} ({} bytes)", url, size);
        let response = builder
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Send {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError::Body {
            url,
            reason: e.to_string(),
        })?;
        Ok(TransportResponse { status, body })
    }
}

/// Multipart form with the image under the `image` field.
pub(crate) fn image_form(image: ImagePart) -> Result<Form, reqwest::Error> {
    let part = Part::bytes(image.data.to_vec())
        .file_name(image.file_name)
        .mime_str(image.mime)?;
    Ok(Form::new().part(IMAGE_FIELD, part))
}
