//! Google Gemini `generateContent` provider.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use serde::Deserialize;
use serde_json::{json, Value};
use vcraft_core::{AppError, AppResult};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when the configuration names none.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Candidate pool size for nucleus sampling.
const TOP_K: u32 = 40;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Gemini generateContent client.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client for the public Gemini API.
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(api_key, DEFAULT_GEMINI_URL)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> AppResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::Config(
                "Gemini provider requires API key".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }

    fn model_name<'a>(&self, request: &'a LlmRequest) -> &'a str {
        let model = request.model.trim();
        if model.is_empty() {
            DEFAULT_GEMINI_MODEL
        } else {
            model.trim_start_matches("models/")
        }
    }

    fn build_body(&self, request: &LlmRequest) -> Value {
        let mut generation_config = json!({ "topK": TOP_K });
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            generation_config["topP"] = json!(top_p);
        }
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        if request.json_mode {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation_config,
        });

        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        body
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let model = self.model_name(request);
        tracing::info!(model = %model, "Sending generateContent request to Gemini");

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Gemini: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let content = extract_text(&reply)
            .ok_or_else(|| AppError::Llm("Gemini response contained no text".to_string()))?;

        let usage = reply
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        tracing::info!("Received {} chars from Gemini", content.len());

        Ok(LlmResponse {
            content,
            model: reply.model_version.unwrap_or_else(|| model.to_string()),
            usage,
        })
    }
}

/// Concatenated text parts of the first candidate.
fn extract_text(reply: &GenerateResponse) -> Option<String> {
    let content = reply.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(GeminiClient::new(""), Err(AppError::Config(_))));
    }

    #[test]
    fn test_build_body() {
        let client = GeminiClient::new("gm-test").unwrap();
        let request = LlmRequest::new("Score this deck", "gemini-1.5-flash")
            .with_system("You are a seed-stage VC")
            .with_temperature(0.7)
            .with_top_p(0.95)
            .with_max_tokens(2048)
            .with_json_mode();

        let body = client.build_body(&request);
        let config = &body["generationConfig"];
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Score this deck");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a seed-stage VC");
        assert_eq!(config["topP"], json!(0.95f32));
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 2048);
        assert_eq!(config["responseMimeType"], "application/json");
    }

    #[test]
    fn test_model_name_defaults() {
        let client = GeminiClient::new("gm-test").unwrap();
        assert_eq!(client.model_name(&LlmRequest::new("hi", "")), DEFAULT_GEMINI_MODEL);
        assert_eq!(
            client.model_name(&LlmRequest::new("hi", "models/gemini-pro")),
            "gemini-pro"
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"score\": "}, {"text": "8}"}]}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4, "totalTokenCount": 16},
            "modelVersion": "gemini-1.5-flash-002"
        }"#;
        let reply: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(&reply).as_deref(), Some("{\"score\": 8}"));
        assert_eq!(reply.usage_metadata.unwrap().candidates_token_count, 4);
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let reply: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(extract_text(&reply).is_none());
    }
}
