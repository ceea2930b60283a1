//! `analyze` command.

use std::path::Path;

use anyhow::{Context, Result};

use super::common::http_client;
use crate::classify::Classifier;
use crate::config::AppConfig;
use crate::pipeline::UploadedImage;

pub async fn analyze(config: &AppConfig, image: &Path, predict: bool, json: bool) -> Result<()> {
    let upload = UploadedImage::from_path(image)
        .with_context(|| format!("Failed to read {}", image.display()))?;
    let classifier = Classifier::new(
        http_client()?,
        config.client.analyze_url()?,
        config.client.predict_url()?,
    );

    let classification = if predict {
        classifier.predict(upload).await?
    } else {
        classifier.analyze(upload).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        println!("{}", classification.verdict(config.client.confidence_scale));
    }
    Ok(())
}
