//! Ask command handler.
//!
//! Grounds a question in retrieved knowledge and sends it to the LLM.

use super::print_json;
use clap::Args;
use vcraft_core::{config::AppConfig, AppResult};
use vcraft_knowledge::KnowledgeContext;
use vcraft_llm::GenerationClient;

const DEFAULT_SYSTEM: &str = "You are an experienced venture capital analyst. \
Answer using only the knowledge provided and say so when it is insufficient.";

/// Ask a question grounded in the knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of chunks to retrieve (default: retrieval.top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// System prompt override
    #[arg(long)]
    pub system: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        // Fail on provider misconfiguration before indexing anything
        let client = GenerationClient::from_settings(&config.llm)?;

        let context = KnowledgeContext::from_config(config)?;
        context.bootstrap().await?;

        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);
        let knowledge = context
            .retriever()
            .retrieve_with_context(&self.question, "", top_k)
            .await?;
        tracing::debug!("Retrieved {} bytes of knowledge context", knowledge.len());

        let prompt = build_prompt(&knowledge, &self.question);
        let system = self.system.as_deref().unwrap_or(DEFAULT_SYSTEM);
        let answer = client.generate(&prompt, Some(system)).await?;

        if self.json {
            print_json(&serde_json::json!({
                "answer": answer,
                "model": config.llm.model,
                "provider": client.provider_name(),
                "topK": top_k,
            }))?;
        } else {
            println!("{}", answer);
        }

        Ok(())
    }
}

fn build_prompt(knowledge: &str, question: &str) -> String {
    format!("{}\n\nQUESTION:\n{}", knowledge.trim_end(), question)
}
