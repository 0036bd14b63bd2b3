use serde::Deserialize;
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};

/// Written on first run so the CLI works without any setup.
pub const STARTER_CONFIG: &str = r#"
[llm]
api_url = "https://api.openai.com/v1"
model = "gpt-4.1-mini"
cluster_model = "gemini-2.5-flash"
script_model = "gemini-2.5-flash"
timeout_secs = 300

[image]
model = "dall-e-3"
size = "1024x1024"

[news]
# tianapi_key = "..."

# [[news.feeds]]
# name = "Hacker News"
# url = "https://news.ycombinator.com/rss"

[store]
data_dir = "."
media_dir = "temp_video"
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub cluster_model: Option<String>,
    pub style_model: Option<String>,
    pub script_model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    pub fn cluster_model(&self) -> &str {
        self.cluster_model.as_deref().unwrap_or(&self.model)
    }

    pub fn style_model(&self) -> &str {
        self.style_model.as_deref().unwrap_or(&self.model)
    }

    pub fn script_model(&self) -> &str {
        self.script_model.as_deref().unwrap_or(&self.model)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImageConfig {
    pub model: String,
    pub size: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NewsConfig {
    pub tianapi_key: Option<String>,
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: String,
    pub media_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: ".".to_string(),
            media_dir: "temp_video".to_string(),
        }
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path))?;
    let mut config = parse_config(&content)?;

    // Keys from the environment win over the file
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.llm.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("TIANAPI_KEY") {
        config.news.tianapi_key = Some(key);
    }

    Ok(config)
}

/// Create a starter config if none exists yet.
pub fn ensure_config(path: &str) -> Result<bool> {
    if Path::new(path).exists() {
        return Ok(false);
    }
    fs::write(path, STARTER_CONFIG)
        .with_context(|| format!("Failed to write starter config: {}", path))?;
    log::info!("Wrote starter config to {}", path);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_parses() {
        let config = parse_config(STARTER_CONFIG).expect("starter config");
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.llm.cluster_model(), "gemini-2.5-flash");
        assert_eq!(config.llm.style_model(), "gpt-4.1-mini");
        assert_eq!(config.image.model, "dall-e-3");
        assert_eq!(config.store.media_dir, "temp_video");
        assert!(config.news.feeds.is_empty());
    }

    #[test]
    fn optional_sections_default() {
        let config = parse_config(
            r#"
[llm]
api_url = "http://localhost:11434/v1"
model = "qwen2.5"
"#,
        )
        .expect("minimal config");
        assert_eq!(config.llm.script_model(), "qwen2.5");
        assert_eq!(config.store.data_dir, ".");
        assert_eq!(config.image.size, "1024x1024");
        assert!(config.news.tianapi_key.is_none());
    }

    #[test]
    fn feeds_are_read() {
        let config = parse_config(
            r#"
[llm]
api_url = "http://localhost:1234/v1"
model = "m"

[news]
tianapi_key = "abc"

[[news.feeds]]
name = "Hacker News"
url = "https://news.ycombinator.com/rss"
"#,
        )
        .expect("config with feeds");
        assert_eq!(config.news.tianapi_key.as_deref(), Some("abc"));
        assert_eq!(config.news.feeds.len(), 1);
        assert_eq!(config.news.feeds[0].name, "Hacker News");
    }

    #[test]
    fn ensure_config_writes_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let path = path.to_str().expect("path");
        assert!(ensure_config(path).expect("first write"));
        assert!(!ensure_config(path).expect("second call"));
        assert!(parse_config(&fs::read_to_string(path).expect("read")).is_ok());
    }
}
