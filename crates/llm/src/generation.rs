//! Timed generation calls with typed structured output.
//!
//! [`GenerationClient`] wraps any [`LlmClient`] with a hard deadline. Expiry
//! becomes `AppError::Timeout`, which callers can retry. Structured replies go
//! through a single parse-and-validate step producing either a complete value
//! of the requested type or `AppError::InvalidResponse`.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::factory::create_client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use vcraft_core::config::LlmSettings;
use vcraft_core::{AppError, AppResult};

/// Default hard timeout for one generation call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOP_P: f32 = 0.95;
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// A reply shape the model is asked to produce.
///
/// Optional fields should be `Option<T>` or carry `#[serde(default)]`;
/// `validate` checks cross-field rules that serde cannot express.
pub trait StructuredOutput: DeserializeOwned {
    /// Reject values that parsed but are semantically incomplete.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Generation client with a hard per-call timeout.
#[derive(Clone)]
pub struct GenerationClient {
    client: Arc<dyn LlmClient>,
    model: String,
    timeout: Duration,
}

impl GenerationClient {
    /// Wrap an existing client.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build the configured provider. Configuration problems are returned here.
    pub fn from_settings(settings: &LlmSettings) -> AppResult<Self> {
        let client = create_client(
            &settings.provider,
            settings.endpoint.as_deref(),
            settings.api_key.as_deref(),
        )?;

        Ok(Self::new(client, settings.model.clone())
            .with_timeout(Duration::from_secs(settings.timeout_secs)))
    }

    /// Override the hard timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Provider name of the wrapped client.
    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    fn build_request(&self, prompt: &str, system: Option<&str>) -> LlmRequest {
        LlmRequest::new(prompt, self.model.clone())
            .with_optional_system(system)
            .with_temperature(DEFAULT_TEMPERATURE)
            .with_top_p(DEFAULT_TOP_P)
            .with_max_tokens(DEFAULT_MAX_TOKENS)
    }

    /// Send a request, failing with `AppError::Timeout` when the deadline passes.
    pub async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(
            provider = self.client.provider_name(),
            model = %request.model,
            "Calling LLM"
        );

        match tokio::time::timeout(self.timeout, self.client.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    "LLM request timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                );
                Err(AppError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }

    /// Generate free text for a prompt and optional system instruction.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> AppResult<String> {
        let request = self.build_request(prompt, system);
        Ok(self.complete(&request).await?.content)
    }

    /// Generate a reply and parse it into `T`.
    pub async fn generate_structured<T: StructuredOutput>(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> AppResult<T> {
        let request = self.build_request(prompt, system).with_json_mode();
        let response = self.complete(&request).await?;
        parse_structured(&response.content)
    }
}

/// Parse model output into `T`, tolerating a surrounding Markdown code fence.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> AppResult<T> {
    let body = strip_code_fences(raw);

    let value: T = serde_json::from_str(body).map_err(|e| {
        tracing::warn!("Structured reply failed to parse: {}", e);
        AppError::InvalidResponse(format!("reply is not valid JSON for the expected shape: {}", e))
    })?;

    value.validate().map_err(AppError::InvalidResponse)?;
    Ok(value)
}

/// Remove a leading ```` ``` ```` / ```` ```json ```` fence and a trailing fence.
fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}
