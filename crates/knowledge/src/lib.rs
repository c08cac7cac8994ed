//! Knowledge retrieval for grounding LLM prompts.
//!
//! Documents are split into word windows ([`chunker`]), embedded
//! ([`embeddings`]) and held in an exact L2 index ([`vector_store`]). The
//! [`retriever`] ties these together and formats results as prompt context;
//! [`context`] wires everything from configuration.

pub mod chunker;
pub mod context;
pub mod embeddings;
pub mod retriever;
pub mod vector_store;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::{chunk, ChunkPolicy};
pub use context::{BootstrapOutcome, KnowledgeContext};
pub use embeddings::{EmbeddingConfig, EmbeddingProvider, EmbeddingService};
pub use retriever::{
    format_context, EmptyReason, InitSummary, Lifecycle, Retrieval, RetrievedChunk, Retriever,
    INSUFFICIENT_DATA,
};
pub use vector_store::VectorStore;
