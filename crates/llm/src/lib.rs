//! LLM integration crate for VCraft.
//!
//! This crate provides a provider-agnostic abstraction for generation calls
//! made by the pitch-analysis layer. Every call goes through
//! [`GenerationClient`], which enforces a hard timeout and turns replies into
//! strongly-typed values.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Chat completions API (requires an API key)
//! - **Gemini**: `generateContent` API (requires an API key)
//!
//! # Example
//! ```no_run
//! use vcraft_core::config::LlmSettings;
//! use vcraft_llm::GenerationClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GenerationClient::from_settings(&LlmSettings::default())?;
//! let text = client.generate("Summarise this pitch", None).await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generation;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use generation::{GenerationClient, StructuredOutput};
pub use providers::{GeminiClient, OllamaClient, OpenAiClient};
pub use types::ProviderType;
