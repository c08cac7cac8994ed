//! Application context owning the long-lived knowledge services.

use crate::chunker::ChunkPolicy;
use crate::embeddings::{EmbeddingConfig, EmbeddingService};
use crate::retriever::{InitSummary, Retriever};
use crate::vector_store::index_exists;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vcraft_core::{AppConfig, AppResult};

/// How [`KnowledgeContext::bootstrap`] made the retriever ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A persisted index was restored
    Loaded { chunks: usize },
    /// Documents were indexed and the index was saved
    Initialized(InitSummary),
}

/// Shared handles to the embedding service and retriever.
///
/// Built once at startup and passed to whatever needs retrieval.
#[derive(Clone)]
pub struct KnowledgeContext {
    embeddings: Arc<EmbeddingService>,
    retriever: Arc<Retriever>,
    knowledge_base_path: PathBuf,
    index_path: PathBuf,
}

impl KnowledgeContext {
    /// Build the services described by `config`. Nothing is loaded yet.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let policy = ChunkPolicy::new(
            config.retrieval.chunk_size,
            config.retrieval.chunk_overlap,
        )?;
        let embeddings = Arc::new(EmbeddingService::new(EmbeddingConfig::from(
            &config.embedding,
        )));

        Ok(Self::new(
            embeddings,
            policy,
            config.knowledge_base_path.clone(),
            config.index_path.clone(),
        ))
    }

    /// Assemble a context from an existing embedding service.
    pub fn new(
        embeddings: Arc<EmbeddingService>,
        policy: ChunkPolicy,
        knowledge_base_path: PathBuf,
        index_path: PathBuf,
    ) -> Self {
        let retriever = Arc::new(Retriever::new(Arc::clone(&embeddings), policy));
        Self {
            embeddings,
            retriever,
            knowledge_base_path,
            index_path,
        }
    }

    pub fn embeddings(&self) -> Arc<EmbeddingService> {
        Arc::clone(&self.embeddings)
    }

    pub fn retriever(&self) -> Arc<Retriever> {
        Arc::clone(&self.retriever)
    }

    pub fn knowledge_base_path(&self) -> &Path {
        &self.knowledge_base_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Index the document directory and save the result, ignoring any saved index.
    pub async fn rebuild(&self) -> AppResult<InitSummary> {
        let summary = self
            .retriever
            .initialize_knowledge_base(&self.knowledge_base_path)
            .await?;
        self.retriever.save_index(&self.index_path).await?;
        Ok(summary)
    }

    /// Make the retriever ready, preferring a persisted index.
    pub async fn bootstrap(&self) -> AppResult<BootstrapOutcome> {
        if index_exists(&self.index_path) {
            tracing::info!("Loading persisted index from {:?}", self.index_path);
            self.retriever.load_index(&self.index_path).await?;
            return Ok(BootstrapOutcome::Loaded {
                chunks: self.retriever.size().await,
            });
        }

        tracing::info!(
            "No persisted index at {:?}, indexing {:?}",
            self.index_path,
            self.knowledge_base_path
        );
        Ok(BootstrapOutcome::Initialized(self.rebuild().await?))
    }
}
