//! `[client]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [client]
//! page_url = "https://mushguard.example/analyze/"  # page that accepts submissions
//! csrf_field = "csrfmiddlewaretoken"               # anti-forgery form field
//! analyze_path = "/analyze/"                       # JSON analysis endpoint
//! predict_path = "/predict/"                       # JSON prediction envelope
//! confidence_scale = "fraction"                    # or "percent"
//! ```
//!
//! The two JSON endpoints are resolved against `page_url`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::ConfidenceScale;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The page hosting the analysis form; submissions POST back to it.
    pub page_url: String,

    pub csrf_field: String,

    pub analyze_path: String,

    pub predict_path: String,

    /// Scale of the confidences the classifier returns.
    pub confidence_scale: ConfidenceScale,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_url: "http://127.0.0.1:8000/analyze/".into(),
            csrf_field: "csrfmiddlewaretoken".into(),
            analyze_path: "/analyze/".into(),
            predict_path: "/predict/".into(),
            confidence_scale: ConfidenceScale::Fraction,
        }
    }
}

impl ClientConfig {
    pub fn page_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.page_url)
    }

    pub fn analyze_url(&self) -> Result<Url, url::ParseError> {
        self.page_url()?.join(&self.analyze_path)
    }

    pub fn predict_url(&self) -> Result<Url, url::ParseError> {
        self.page_url()?.join(&self.predict_path)
    }
}
