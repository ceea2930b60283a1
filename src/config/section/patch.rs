//! `[patch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [patch]
//! result_selector = ".result"
//! anchor_selector = "#analyze-form"
//!
//! # Stylesheet injected whenever a script whose file name contains
//! # `script` is activated.
//! [[patch.stylesheets]]
//! script = "leaflet"
//! href = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css"
//! ```

use serde::{Deserialize, Serialize};

use crate::activate::StylesheetDependency;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Node replaced by each response.
    pub result_selector: String,

    /// Node the result is inserted after when the page has none yet.
    pub anchor_selector: String,

    pub stylesheets: Vec<StylesheetDependency>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            result_selector: ".result".into(),
            anchor_selector: "#analyze-form".into(),
            stylesheets: vec![StylesheetDependency {
                script: "leaflet".into(),
                href: "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css".into(),
            }],
        }
    }
}
