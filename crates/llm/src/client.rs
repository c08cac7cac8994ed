//! Provider-neutral generation request and reply.
//!
//! Every provider turns an [`LlmRequest`] into its own wire body and maps the
//! reply back to an [`LlmResponse`]. Sampling fields left as `None` are not
//! sent, so the provider's own default applies.

use serde::{Deserialize, Serialize};
use vcraft_core::AppResult;

/// One single-shot generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// User turn
    pub prompt: String,

    /// Instruction placed ahead of the prompt, e.g. a reviewer persona
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Provider model id such as "llama3.2" or "gemini-1.5-flash"
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Upper bound on reply tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Reply must be one JSON object
    #[serde(default)]
    pub json_mode: bool,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            model: model.into(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Like [`with_system`](Self::with_system), leaving the request alone for `None`.
    pub fn with_optional_system(self, system: Option<&str>) -> Self {
        match system {
            Some(system) => self.with_system(system),
            None => self,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Reply text plus accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,

    /// Model that answered, as reported by the provider
    pub model: String,

    pub usage: LlmUsage,
}

/// Token counts; zero when the provider does not report them.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A generation backend.
///
/// Implementations perform one request and return; deadlines are applied by
/// [`crate::GenerationClient`].
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider id used in logs ("ollama", "openai", "gemini").
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("Rate this pitch", "llama3.2")
            .with_system("You are a seed-stage VC")
            .with_temperature(0.7)
            .with_top_p(0.95)
            .with_max_tokens(2048)
            .with_json_mode();

        assert_eq!(request.model, "llama3.2");
        assert_eq!(request.system.as_deref(), Some("You are a seed-stage VC"));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.top_p, Some(0.95));
        assert_eq!(request.max_tokens, Some(2048));
        assert!(request.json_mode);
    }

    #[test]
    fn test_optional_system() {
        let plain = LlmRequest::new("Rate this pitch", "llama3.2").with_optional_system(None);
        assert!(plain.system.is_none());

        let framed = LlmRequest::new("Rate this pitch", "llama3.2")
            .with_optional_system(Some("Be blunt"));
        assert_eq!(framed.system.as_deref(), Some("Be blunt"));
    }

    #[test]
    fn test_unset_sampling_is_not_serialized() {
        let value = serde_json::to_value(LlmRequest::new("hi", "llama3.2")).unwrap();
        assert!(value.get("temperature").is_none());
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["json_mode"], false);
    }

    #[test]
    fn test_usage_total() {
        let usage = LlmUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }
}
