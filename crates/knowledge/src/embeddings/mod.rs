//! Embedding service for the knowledge base.
//!
//! [`EmbeddingService`] owns one provider for the lifetime of the process.
//! The provider is created lazily on first use (or through
//! [`EmbeddingService::warmup`]) and exactly once: a failed load is
//! remembered and every later call fails with `AppError::ModelUnavailable`.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use std::sync::Arc;
use tokio::sync::OnceCell;
use vcraft_core::{AppError, AppResult};

type LoadedProvider = Result<Arc<dyn EmbeddingProvider>, String>;

/// Text-to-vector service with a fixed output dimension.
pub struct EmbeddingService {
    config: EmbeddingConfig,
    provider: OnceCell<LoadedProvider>,
}

impl EmbeddingService {
    /// Create a service that will load the configured provider on first use.
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
        }
    }

    /// Create a service around an already constructed provider.
    pub fn from_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let config = EmbeddingConfig {
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            dimensions: provider.dimensions(),
            ..Default::default()
        };

        Self {
            config,
            provider: OnceCell::new_with(Some(Ok(provider))),
        }
    }

    /// Output width of every vector. Known before the model is loaded.
    pub fn dimension(&self) -> usize {
        self.config.dimensions
    }

    /// Configured model identifier.
    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Whether the provider has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self.provider.get(), Some(Ok(_)))
    }

    /// Load the provider now instead of on the first request.
    pub async fn warmup(&self) -> AppResult<()> {
        self.provider().await.map(|_| ())
    }

    async fn provider(&self) -> AppResult<Arc<dyn EmbeddingProvider>> {
        let loaded = self
            .provider
            .get_or_init(|| async {
                tracing::info!(
                    "Loading embedding model: provider={}, model={}, dimensions={}",
                    self.config.provider,
                    self.config.model,
                    self.config.dimensions
                );

                match create_provider(&self.config).await {
                    Ok(provider) if provider.dimensions() != self.config.dimensions => Err(format!(
                        "provider '{}' produces {} dimensions, configured {}",
                        provider.provider_name(),
                        provider.dimensions(),
                        self.config.dimensions
                    )),
                    Ok(provider) => Ok(provider),
                    Err(e) => {
                        tracing::error!("Embedding model failed to load: {}", e);
                        Err(e.to_string())
                    }
                }
            })
            .await;

        match loaded {
            Ok(provider) => Ok(Arc::clone(provider)),
            Err(reason) => Err(AppError::ModelUnavailable(reason.clone())),
        }
    }

    /// Embed one text.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }

    /// Embed texts in order. An empty input returns immediately.
    pub async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.provider().await?;

        tracing::debug!(
            "Embedding {} texts using provider '{}' (model: {})",
            texts.len(),
            provider.provider_name(),
            provider.model_name()
        );

        let vectors = provider.embed_batch(texts).await?;

        if vectors.len() != texts.len() {
            return Err(AppError::Knowledge(format!(
                "Provider returned {} embeddings for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.config.dimensions) {
            return Err(AppError::DimensionMismatch {
                expected: self.config.dimensions,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }
}
