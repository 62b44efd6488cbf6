//! Anthropic Messages API completion client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use juris_core::{Completer, CompletionConfig, JurisError, Result};

/// Completion client backed by the Anthropic Messages API.
///
/// The API key comes from the configuration, falling back to the
/// `ANTHROPIC_API_KEY` environment variable. A missing key is not an
/// error until a completion is actually requested, so read-only
/// commands work without credentials.
pub struct AnthropicCompleter {
    /// Model identifier sent with every request.
    pub model: String,

    /// API base URL.
    pub base_url: String,

    max_tokens: u32,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl AnthropicCompleter {
    /// Create a new completer from configuration.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| JurisError::completion(format!("Failed to build HTTP client: {}", e)))?;

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            max_tokens: config.max_tokens,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Completer for AnthropicCompleter {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            JurisError::completion("No API key configured (set ANTHROPIC_API_KEY)")
        })?;

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });
        if !system.is_empty() {
            body["system"] = serde_json::Value::String(system.to_string());
        }

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        debug!("Requesting completion from {} ({})", url, self.model);

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| JurisError::completion(format!("Request failed: {}", e)))?;

        let status = resp.status().as_u16();
        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| JurisError::completion(format!("Invalid response body: {}", e)))?;

        if status >= 400 {
            let message = json["error"]["message"]
                .as_str()
                .or_else(|| json["message"].as_str())
                .unwrap_or("unknown API error");
            return Err(JurisError::completion(format!(
                "API error [{}]: {}",
                status, message
            )));
        }

        let text = json["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .and_then(|block| block["text"].as_str())
            .unwrap_or("")
            .to_string();

        if text.is_empty() {
            return Err(JurisError::completion("Empty completion response"));
        }

        debug!("Completion returned {} chars", text.chars().count());

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_from_default_config() {
        let config = CompletionConfig::default();
        let completer = AnthropicCompleter::new(&config).unwrap();
        assert_eq!(completer.model, "claude-opus-4-5");
        assert_eq!(completer.base_url, "https://api.anthropic.com");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_at_call_time() {
        std::env::remove_var("ANTHROPIC_API_KEY");

        let config = CompletionConfig::default();
        let completer = AnthropicCompleter::new(&config).unwrap();
        let err = completer.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, JurisError::Completion { .. }));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }
}
