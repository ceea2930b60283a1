//! Client for the JSON classification endpoints.
//!
//! - `POST /analyze/` answers with the analysis object itself, or with
//!   `{"error": ...}` and a non-2xx status.
//! - `POST /predict/` always answers 200 with an envelope
//!   `{"success": bool, "result"?: ..., "error"?: ...}`.
//!
//! Both may report that the picture is not a mushroom at all
//! (`preliminary_passed: false`) instead of an edibility analysis.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::debug;
use crate::pipeline::{UploadedImage, image_form};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classification request failed: {0}")]
    Request(String),

    #[error("classifier answered HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("classifier rejected the image: {0}")]
    Rejected(String),

    #[error("unexpected classifier response: {0}")]
    Decode(String),
}

/// Edibility analysis of a mushroom photo. Species details are only present
/// for edible results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub is_edible: bool,
    pub edibility_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preservation: Option<String>,
}

/// The photo failed the "is this a mushroom" check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotAMushroom {
    pub confidence: f64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Classification {
    Analysis(Analysis),
    NotAMushroom(NotAMushroom),
}

/// How the server reports confidences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceScale {
    /// `0.0..=1.0`
    #[default]
    Fraction,
    /// `0.0..=100.0`
    Percent,
}

impl ConfidenceScale {
    /// Render `value` as a percentage with one decimal.
    pub fn format(self, value: f64) -> String {
        let pct = match self {
            Self::Fraction => value * 100.0,
            Self::Percent => value,
        };
        format!("{pct:.1}%")
    }
}

impl Analysis {
    /// Human summary, one fact per line.
    pub fn verdict(&self, scale: ConfidenceScale) -> String {
        let label = if self.is_edible { "EDIBLE" } else { "POISONOUS" };
        let mut out = format!(
            "{label} ({} confidence)",
            scale.format(self.edibility_confidence)
        );
        if let Some(species) = &self.species {
            let name = species.replace('_', " ");
            match self.species_confidence {
                Some(c) => out.push_str(&format!("\nSpecies: {name} ({})", scale.format(c))),
                None => out.push_str(&format!("\nSpecies: {name}")),
            }
        }
        if let Some(lifespan) = &self.lifespan {
            out.push_str(&format!("\nLifespan: {lifespan}"));
        }
        if let Some(preservation) = &self.preservation {
            out.push_str(&format!("\nPreservation: {preservation}"));
        }
        out
    }
}

impl Classification {
    pub fn verdict(&self, scale: ConfidenceScale) -> String {
        match self {
            Self::Analysis(analysis) => analysis.verdict(scale),
            Self::NotAMushroom(rejection) => format!(
                "NOT A MUSHROOM ({} confidence)\n{}",
                scale.format(rejection.confidence),
                rejection
                    .message
                    .as_deref()
                    .unwrap_or("Please upload another image.")
            ),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Interpret a `/analyze/` response.
pub fn parse_analyze(status: u16, body: &str) -> Result<Classification, ClassifyError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(ClassifyError::Server { status, message });
    }
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        return Err(ClassifyError::Rejected(error));
    }
    serde_json::from_str(body).map_err(|e| ClassifyError::Decode(e.to_string()))
}

/// Interpret a `/predict/` envelope.
pub fn parse_predict(body: &str) -> Result<Classification, ClassifyError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| ClassifyError::Decode(e.to_string()))?;
    if !envelope.success {
        return Err(ClassifyError::Rejected(
            envelope.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    let result = envelope
        .result
        .ok_or_else(|| ClassifyError::Decode("envelope has no `result`".to_string()))?;
    if let Some(error) = result.get("error").and_then(|e| e.as_str()) {
        return Err(ClassifyError::Rejected(error.to_string()));
    }
    serde_json::from_value(result).map_err(|e| ClassifyError::Decode(e.to_string()))
}

pub struct Classifier {
    client: reqwest::Client,
    analyze_url: Url,
    predict_url: Url,
}

impl Classifier {
    pub fn new(client: reqwest::Client, analyze_url: Url, predict_url: Url) -> Self {
        Self {
            client,
            analyze_url,
            predict_url,
        }
    }

    pub async fn analyze(&self, image: UploadedImage) -> Result<Classification, ClassifyError> {
        let (status, body) = self.post(&self.analyze_url, image).await?;
        parse_analyze(status, &body)
    }

    pub async fn predict(&self, image: UploadedImage) -> Result<Classification, ClassifyError> {
        let (status, body) = self.post(&self.predict_url, image).await?;
        if !(200..300).contains(&status) {
            return Err(ClassifyError::Server {
                status,
                message: body.trim().to_string(),
            });
        }
        parse_predict(&body)
    }

    async fn post(&self, url: &Url, image: UploadedImage) -> Result<(u16, String), ClassifyError> {
        let request_err = |e: reqwest::Error| ClassifyError::Request(e.to_string());

        debug!("submit"; "classifying {} via {}", image.file_name(), url);
        let form = image_form(image.into_part()).map_err(request_err)?;
        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(request_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(request_err)?;
        Ok((status, body))
    }
}
