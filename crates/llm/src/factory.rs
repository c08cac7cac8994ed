//! LLM provider factory.
//!
//! This module creates LLM clients from configuration. Anything wrong with
//! the configuration surfaces as `AppError::Config` at construction time,
//! never on the first request.

use crate::client::LlmClient;
use crate::providers::{
    gemini::DEFAULT_GEMINI_URL, ollama::DEFAULT_OLLAMA_URL, openai::DEFAULT_OPENAI_URL,
};
use crate::providers::{GeminiClient, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use std::sync::Arc;
use vcraft_core::{AppError, AppResult};

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "gemini")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", provider)))?;

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => {
            Arc::new(OllamaClient::with_base_url(endpoint.unwrap_or(DEFAULT_OLLAMA_URL)))
        }
        ProviderType::OpenAI => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI provider requires API key".to_string())
            })?;
            Arc::new(OpenAiClient::with_base_url(
                key,
                endpoint.unwrap_or(DEFAULT_OPENAI_URL),
            )?)
        }
        ProviderType::Gemini => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("Gemini provider requires API key".to_string())
            })?;
            Arc::new(GeminiClient::with_base_url(
                key,
                endpoint.unwrap_or(DEFAULT_GEMINI_URL),
            )?)
        }
    };

    tracing::debug!("Created LLM client for provider '{}'", provider_type.as_str());
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("requires API key")),
            Err(other) => panic!("Expected config error, got {}", other),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client("openai", None, Some("sk-test")).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_create_gemini_client() {
        let client = create_client("gemini", None, Some("gm-test")).unwrap();
        assert_eq!(client.provider_name(), "gemini");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        match create_client("gemini", None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("Gemini provider requires API key")),
            Err(other) => panic!("Expected config error, got {}", other),
            Ok(_) => panic!("Expected error for Gemini without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("anthropic", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown LLM provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
