use anyhow::Result;
use reqwest::Client;
use serde_json::json;
use crate::core::config::LlmConfig;

pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

/// One chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest<'a> {
    pub model: Option<&'a str>,
    pub system: Option<&'a str>,
    pub prompt: &'a str,
    pub temperature: Option<f32>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        let timeout = config.timeout_secs.unwrap_or(300);
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout))
                .build()
                .unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub async fn chat(&self, prompt: &str) -> Result<String> {
        self.complete(ChatRequest {
            prompt,
            ..Default::default()
        })
        .await
    }

    pub async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let model = request.model.unwrap_or(&self.config.model);
        let body = build_body(model, &request);

        // Assume api_url is like "https://api.openai.com/v1"
        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));

        log::info!("Sending LLM request to {} (model {}, {} prompt chars)", url, model, request.prompt.chars().count());

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Failed to connect to LLM at {}: {}", url, e);
                return Err(anyhow::anyhow!("LLM Connection Failed: {}", e));
            }
        };

        if !res.status().is_success() {
            let status = res.status();
            let error_text = res.text().await.unwrap_or_default();
            log::error!("LLM Error {}: {}", status, error_text);
            return Err(anyhow::anyhow!("LLM API Error {}: {}", status, error_text));
        }

        let response_json: serde_json::Value = res.json().await?;
        log::debug!("Received LLM response: {}", response_json);

        // OpenAI format: choices[0].message.content
        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Unexpected LLM response format: {}", response_json))?;

        Ok(strip_think(content))
    }
}

fn build_body(model: &str, request: &ChatRequest<'_>) -> serde_json::Value {
    let mut messages = Vec::new();
    if let Some(system) = request.system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": request.prompt }));

    let mut body = json!({
        "model": model,
        "messages": messages,
        "stream": false
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

/// Drop a leading `<think>...</think>` block some reasoning models emit.
pub fn strip_think(text: &str) -> String {
    match text.find("</think>") {
        Some(idx) => text[idx + "</think>".len()..].trim().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_block_is_removed() {
        assert_eq!(strip_think("<think>推理中</think>\n\n[1, 2]"), "[1, 2]");
        assert_eq!(strip_think("plain"), "plain");
    }

    #[test]
    fn body_carries_system_and_temperature() {
        let body = build_body(
            "gpt-4.1-mini",
            &ChatRequest {
                system: Some("你是一个专业的自媒体风格分析师。"),
                prompt: "分析",
                temperature: Some(0.3),
                ..Default::default()
            },
        );
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "分析");
        assert!((body["temperature"].as_f64().expect("temperature") - 0.3).abs() < 1e-6);
    }

    #[test]
    fn body_without_system_has_one_message() {
        let body = build_body("m", &ChatRequest { prompt: "hi", ..Default::default() });
        assert_eq!(body["messages"].as_array().map(|m| m.len()), Some(1));
        assert!(body.get("temperature").is_none());
    }
}
