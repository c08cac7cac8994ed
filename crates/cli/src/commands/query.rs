//! Query command handler.
//!
//! Retrieves knowledge for a query and prints it as prompt context.

use super::print_json;
use clap::Args;
use vcraft_core::{config::AppConfig, AppResult};
use vcraft_knowledge::KnowledgeContext;

/// Retrieve knowledge relevant to a query
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Query text
    pub text: String,

    /// Number of chunks to retrieve (default: retrieval.top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Text placed before the knowledge block
    #[arg(long)]
    pub prefix: Option<String>,

    /// Output scored chunks as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");
        config.validate_retrieval()?;

        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);
        let context = KnowledgeContext::from_config(config)?;
        context.bootstrap().await?;
        let retriever = context.retriever();

        if self.json {
            let retrieval = retriever.retrieve_scored(&self.text, top_k).await?;
            print_json(&serde_json::json!({
                "query": self.text,
                "topK": top_k,
                "result": retrieval,
            }))?;
        } else {
            let formatted = retriever
                .retrieve_with_context(&self.text, self.prefix.as_deref().unwrap_or(""), top_k)
                .await?;
            print!("{}", formatted);
            if !formatted.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
