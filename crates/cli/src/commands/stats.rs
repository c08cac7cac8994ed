//! Stats command handler.
//!
//! Reports the state of the persisted index without loading the embedding model.

use super::print_json;
use clap::Args;
use vcraft_core::{config::AppConfig, AppResult};
use vcraft_knowledge::vector_store::{index_exists, VectorStore};

/// Show knowledge base and index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index = &config.index_path;
        let store = if index_exists(index) {
            Some(VectorStore::read_from(index)?)
        } else {
            None
        };

        let documents = count_documents(config);

        if self.json {
            print_json(&serde_json::json!({
                "knowledgeBase": config.knowledge_base_path,
                "documentFiles": documents,
                "index": index,
                "indexed": store.is_some(),
                "chunks": store.as_ref().map(VectorStore::size),
                "dimension": store.as_ref().map(VectorStore::dimension),
                "embeddingModel": config.embedding.model,
            }))?;
            return Ok(());
        }

        println!("Knowledge base: {}", config.knowledge_base_path.display());
        match documents {
            Some(n) => println!("  Document files: {}", n),
            None => println!("  (directory missing)"),
        }

        println!("Index: {}", index.display());
        match store {
            Some(store) => {
                println!("  Chunks: {}", store.size());
                println!("  Dimension: {}", store.dimension());
            }
            None => println!("  (not built, run `vcraft init`)"),
        }
        println!("Embedding model: {}", config.embedding.model);

        Ok(())
    }
}

/// Number of `*.txt` files directly inside the knowledge base directory.
fn count_documents(config: &AppConfig) -> Option<usize> {
    let entries = std::fs::read_dir(&config.knowledge_base_path).ok()?;
    Some(
        entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "txt"))
            .count(),
    )
}
