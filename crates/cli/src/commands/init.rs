//! Init command handler.
//!
//! Indexes the knowledge base directory and saves the vector index.

use super::print_json;
use clap::Args;
use vcraft_core::{config::AppConfig, AppResult};
use vcraft_knowledge::KnowledgeContext;

/// Index the knowledge base and save the vector index
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Load the embedding model before reading documents
    #[arg(long)]
    pub warmup: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InitCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing init command");
        config.validate_retrieval()?;

        let context = KnowledgeContext::from_config(config)?;
        if self.warmup {
            context.embeddings().warmup().await?;
        }

        let summary = context.rebuild().await?;

        if self.json {
            print_json(&serde_json::json!({
                "knowledgeBase": context.knowledge_base_path(),
                "index": context.index_path(),
                "filesRead": summary.files_read,
                "filesSkipped": summary.files_skipped,
                "chunksIndexed": summary.chunks_indexed,
            }))?;
        } else {
            println!(
                "Indexed {} chunks from {} files in {} -> {}",
                summary.chunks_indexed,
                summary.files_read,
                context.knowledge_base_path().display(),
                context.index_path().display()
            );
            if summary.files_skipped > 0 {
                println!("Skipped {} unreadable files", summary.files_skipped);
            }
        }

        Ok(())
    }
}
