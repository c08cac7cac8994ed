//! Knowledge base loading and query-time retrieval.
//!
//! A [`Retriever`] starts `Uninitialized`. [`Retriever::initialize_knowledge_base`]
//! reads every `*.txt` file in a directory, chunks it, embeds all chunks in one
//! batch and bulk-loads them into the vector store, then marks the retriever
//! `Ready`. Queries against a retriever that is not ready, or whose store is
//! empty, return nothing rather than failing.

use crate::chunker::ChunkPolicy;
use crate::embeddings::EmbeddingService;
use crate::vector_store::VectorStore;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use vcraft_core::AppResult;
use walkdir::WalkDir;

/// Returned by [`Retriever::retrieve_with_context`] when nothing was retrieved.
pub const INSUFFICIENT_DATA: &str = "Insufficient data in knowledge base.";

const CONTEXT_HEADING: &str = "RELEVANT VC KNOWLEDGE:";
const CONTEXT_FOOTER: &str = "USE ONLY THE ABOVE KNOWLEDGE TO ANSWER. DO NOT HALLUCINATE.";
const RULE_WIDTH: usize = 50;

/// Knowledge base lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    /// Loaded, possibly with zero documents
    Ready,
}

/// A retrieved chunk with its squared L2 distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub distance: f32,
}

/// Why a retrieval produced no chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The knowledge base was never initialized or loaded
    Uninitialized,
    /// Initialized, but the store holds no documents
    EmptyKnowledgeBase,
    /// The store has documents but none were returned (e.g. `top_k == 0`)
    NoMatches,
}

/// Outcome of a scored retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "chunks", rename_all = "snake_case")]
pub enum Retrieval {
    Ready(Vec<RetrievedChunk>),
    Empty(EmptyReason),
}

impl Retrieval {
    /// Retrieved chunks, empty for [`Retrieval::Empty`].
    pub fn chunks(&self) -> &[RetrievedChunk] {
        match self {
            Self::Ready(chunks) => chunks,
            Self::Empty(_) => &[],
        }
    }

    /// Consume the result, keeping only the texts in retrieval order.
    pub fn into_texts(self) -> Vec<String> {
        match self {
            Self::Ready(chunks) => chunks.into_iter().map(|c| c.text).collect(),
            Self::Empty(_) => Vec::new(),
        }
    }
}

/// What an initialization pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitSummary {
    pub files_read: usize,
    pub files_skipped: usize,
    pub chunks_indexed: usize,
    /// True when the call found the retriever already ready and did nothing
    pub already_initialized: bool,
}

struct Inner {
    store: VectorStore,
    lifecycle: Lifecycle,
}

/// Vector-store-backed retriever shared across request handlers.
pub struct Retriever {
    embeddings: Arc<EmbeddingService>,
    policy: ChunkPolicy,
    inner: RwLock<Inner>,
}

impl Retriever {
    /// Create an uninitialized retriever whose store matches the service's dimension.
    pub fn new(embeddings: Arc<EmbeddingService>, policy: ChunkPolicy) -> Self {
        let store = VectorStore::new(embeddings.dimension());
        Self {
            embeddings,
            policy,
            inner: RwLock::new(Inner {
                store,
                lifecycle: Lifecycle::Uninitialized,
            }),
        }
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        self.inner.read().await.lifecycle
    }

    pub async fn is_initialized(&self) -> bool {
        self.lifecycle().await == Lifecycle::Ready
    }

    /// Number of indexed chunks.
    pub async fn size(&self) -> usize {
        self.inner.read().await.store.size()
    }

    /// Vector width of the underlying store.
    pub async fn dimension(&self) -> usize {
        self.inner.read().await.store.dimension()
    }

    /// Load every `*.txt` file directly inside `path` into the store.
    ///
    /// Calling this again once ready does nothing. A missing directory is
    /// created and leaves an empty, ready knowledge base. Files that cannot be
    /// read are skipped. Embedding or insertion failures are returned and the
    /// retriever stays uninitialized.
    pub async fn initialize_knowledge_base(&self, path: &Path) -> AppResult<InitSummary> {
        let mut inner = self.inner.write().await;

        if inner.lifecycle == Lifecycle::Ready {
            tracing::debug!("Knowledge base already initialized, skipping");
            return Ok(InitSummary {
                already_initialized: true,
                ..Default::default()
            });
        }

        if !path.is_dir() {
            tracing::warn!(
                "Knowledge base directory {:?} does not exist, creating it; retrieval will return no results",
                path
            );
            fs::create_dir_all(path)?;
            inner.lifecycle = Lifecycle::Ready;
            return Ok(InitSummary::default());
        }

        let mut summary = InitSummary::default();
        let mut chunks = Vec::new();

        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file_path = entry.path();
            let is_text = file_path.extension().map_or(false, |ext| ext == "txt");
            if !entry.file_type().is_file() || !is_text {
                continue;
            }

            match fs::read_to_string(file_path) {
                Ok(text) => {
                    let file_chunks = self.policy.apply(&text)?;
                    tracing::debug!("Chunked {:?} into {} chunks", file_path, file_chunks.len());
                    chunks.extend(file_chunks);
                    summary.files_read += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {:?}: {}", file_path, e);
                    summary.files_skipped += 1;
                }
            }
        }

        if chunks.is_empty() {
            tracing::warn!(
                "No documents found in {:?}; retrieval will return no results",
                path
            );
            inner.lifecycle = Lifecycle::Ready;
            return Ok(summary);
        }

        let vectors = self.embeddings.embed_batch(&chunks).await?;
        inner.store.add_documents(&vectors, &chunks)?;
        inner.lifecycle = Lifecycle::Ready;

        summary.chunks_indexed = chunks.len();
        tracing::info!(
            "Knowledge base initialized: {} files, {} chunks",
            summary.files_read,
            summary.chunks_indexed
        );

        Ok(summary)
    }

    /// Nearest chunks to `query` with their distances.
    pub async fn retrieve_scored(&self, query: &str, top_k: usize) -> AppResult<Retrieval> {
        let inner = self.inner.read().await;

        if inner.lifecycle == Lifecycle::Uninitialized {
            return Ok(Retrieval::Empty(EmptyReason::Uninitialized));
        }
        if inner.store.is_empty() {
            return Ok(Retrieval::Empty(EmptyReason::EmptyKnowledgeBase));
        }

        let query_vector = self.embeddings.embed(query).await?;
        let results = inner.store.search(&query_vector, top_k)?;

        for (rank, (_, distance)) in results.iter().enumerate() {
            tracing::debug!(rank, distance, "Retrieved chunk");
        }

        if results.is_empty() {
            return Ok(Retrieval::Empty(EmptyReason::NoMatches));
        }

        Ok(Retrieval::Ready(
            results
                .into_iter()
                .map(|(text, distance)| RetrievedChunk { text, distance })
                .collect(),
        ))
    }

    /// Texts of the `top_k` nearest chunks, nearest first.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<String>> {
        Ok(self.retrieve_scored(query, top_k).await?.into_texts())
    }

    /// Retrieve and format chunks as a grounding block for a prompt.
    pub async fn retrieve_with_context(
        &self,
        query: &str,
        context_prefix: &str,
        top_k: usize,
    ) -> AppResult<String> {
        let documents = self.retrieve(query, top_k).await?;
        Ok(format_context(context_prefix, &documents))
    }

    /// Persist the store into `dir`.
    pub async fn save_index(&self, dir: &Path) -> AppResult<()> {
        self.inner.read().await.store.save(dir)
    }

    /// Replace the store with the one persisted in `dir` and mark the retriever ready.
    pub async fn load_index(&self, dir: &Path) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.store.load(dir)?;

        if inner.store.dimension() != self.embeddings.dimension() {
            tracing::warn!(
                "Loaded index has dimension {} but the embedding model produces {}; queries will fail",
                inner.store.dimension(),
                self.embeddings.dimension()
            );
        }

        inner.lifecycle = Lifecycle::Ready;
        Ok(())
    }
}

/// Lay out retrieved documents between a heading and a grounding instruction.
pub fn format_context(context_prefix: &str, documents: &[String]) -> String {
    if documents.is_empty() {
        return INSUFFICIENT_DATA.to_string();
    }

    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    if !context_prefix.is_empty() {
        out.push_str(context_prefix);
        out.push_str("\n\n");
    }
    out.push_str(CONTEXT_HEADING);
    out.push('\n');
    out.push_str(&rule);
    out.push_str("\n\n");

    for (i, doc) in documents.iter().enumerate() {
        out.push_str(&format!("[Source {}]\n{}\n\n", i + 1, doc));
    }

    out.push_str(&rule);
    out.push('\n');
    out.push_str(CONTEXT_FOOTER);
    out.push('\n');
    out
}
