use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::Client;
use serde_json::json;
use tracing::debug;

use crate::config::VisionConfig;
use crate::ocr::response::VisionResponse;
use crate::ocr::OcrProvider;

const FEATURE: &str = "DOCUMENT_TEXT_DETECTION";

/// Google Cloud Vision `images:annotate` client.
#[derive(Debug, Clone)]
pub struct VisionClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl VisionClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &VisionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .context("no Vision API key configured; pass --api-key or set VISION_KEY")?;
        Self::new(
            config.endpoint.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

impl OcrProvider for VisionClient {
    fn annotate(&self, image: &[u8], language: &str) -> Result<VisionResponse> {
        let body = json!({
            "requests": [{
                "image": { "content": BASE64.encode(image) },
                "imageContext": { "languageHints": [language] },
                "features": [{ "type": FEATURE }],
            }]
        });

        let url = format!("{}/v1/images:annotate", self.endpoint);
        debug!(%url, bytes = image.len(), language, "sending image to Vision");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .with_context(|| format!("failed to reach {url}"))?;

        let status = response.status();
        let text = response.text().context("failed to read Vision response body")?;
        if !status.is_success() {
            anyhow::bail!("Vision request failed with {status}: {text}");
        }

        let decoded =
            VisionResponse::from_json(&text).context("failed to parse Vision JSON response")?;
        if let Some(error) = decoded.responses.iter().find_map(|entry| entry.error.as_ref()) {
            anyhow::bail!("Vision rejected the image ({}): {}", error.code, error.message);
        }
        Ok(decoded)
    }
}
