use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::config::{ImageConfig, LlmConfig};

pub const IMAGE_PROMPT_PREFIX: &str =
    "Professional financial news illustration, 16:9 aspect ratio, high quality, modern style: ";
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://via.placeholder.com/1024x576.png?text=Image+Generation+Failed";

/// Text-to-image against the same OpenAI-compatible endpoint as the LLM.
pub struct ImageClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    config: ImageConfig,
}

impl ImageClient {
    pub fn new(llm: &LlmConfig, config: ImageConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(180))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: llm.api_url.clone(),
            api_key: llm.api_key.clone(),
            config,
        }
    }

    /// URL of the generated picture, or the placeholder when generation fails.
    pub async fn generate(&self, description: &str) -> String {
        match self.request(description).await {
            Ok(url) => url,
            Err(e) => {
                log::error!("Error generating image: {}", e);
                PLACEHOLDER_IMAGE_URL.to_string()
            }
        }
    }

    async fn request(&self, description: &str) -> Result<String> {
        let url = format!("{}/images/generations", self.api_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "prompt": image_prompt(description),
            "n": 1,
            "size": self.config.size,
        });

        log::info!("Requesting image for: {}", description.chars().take(40).collect::<String>());

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let res = builder.send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("Image API error {}: {}", status, text));
        }

        let json: serde_json::Value = res.json().await?;
        let image_url = json["data"][0]["url"]
            .as_str()
            .ok_or_else(|| anyhow!("No image URL in response"))?;
        Ok(image_url.to_string())
    }
}

pub fn image_prompt(description: &str) -> String {
    format!("{}{}", IMAGE_PROMPT_PREFIX, description)
}

/// Voice-over is not synthesised yet; every text maps to a stable path
/// where its audio would live.
pub fn audio_placeholder(media_dir: &Path, text: &str) -> PathBuf {
    let digest = Sha256::digest(text.as_bytes());
    let name = format!("audio_{}.mp3", &hex::encode(digest)[..16]);
    media_dir.join(name)
}
