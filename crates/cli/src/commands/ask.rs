//! Ask command handler.
//!
//! Brings the index up, then answers one question through the RAG pipeline.

use clap::Args;
use placement_core::{config::AppConfig, AppError, AppResult};
use placement_knowledge::rag::NO_QUESTION;
use placement_knowledge::{initialize, AnswerResult, ChatReply, IngestOptions, RagPipeline};
use std::path::PathBuf;

use super::{embedder, llm_client, print_json};

/// Answer a question from the corpus
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Query variants, including the original
    #[arg(long)]
    pub variants: Option<usize>,

    /// Passages kept after merging
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Print the reply as JSON
    #[arg(long)]
    pub json: bool,

    /// List the sources behind the answer
    #[arg(long)]
    pub show_sources: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let result = match self.get_question()? {
            Some(question) => self.answer(config, &question).await,
            None => Err(AppError::InvalidInput(NO_QUESTION.to_string())),
        };
        let (status, reply) = ChatReply::from_result(&result);
        tracing::debug!("Reply status: {}", status);

        if self.json {
            let mut output = serde_json::to_value(&reply)?;
            if let (true, Ok(answer)) = (self.show_sources, &result) {
                output["sources"] = serde_json::to_value(&answer.sources)?;
            }
            print_json(&output)?;
        } else if let Ok(answer) = &result {
            println!("{}", answer.answer());

            if self.show_sources {
                println!();
                if answer.sources.is_empty() {
                    println!("Sources: (no sources available)");
                } else {
                    println!("Sources:");
                    for source in &answer.sources {
                        println!("- {} ({}): {}", source.source, source.location, source.snippet);
                    }
                }
            }
        }

        result.map(|_| ())
    }

    async fn answer(&self, config: &AppConfig, question: &str) -> AppResult<AnswerResult> {
        config.validate()?;

        let embedder = embedder(config)?;
        let (index, _) = initialize(&IngestOptions::from_config(config), embedder.clone()).await?;
        let pipeline = RagPipeline::from_config(config, index, embedder, llm_client(config)?)?;

        let mut params = pipeline.retriever().params();
        if let Some(variants) = self.variants {
            params.variants = variants.max(1);
        }
        if let Some(top_k) = self.top_k {
            params.total_k = top_k.max(1);
        }

        pipeline.ask_with(question, params).await
    }

    /// Question from the argument or the file; `None` when neither has text.
    fn get_question(&self) -> AppResult<Option<String>> {
        let text = match (&self.question, &self.file) {
            (Some(q), _) => Some(q.clone()),
            (None, Some(path)) => Some(std::fs::read_to_string(path)?),
            (None, None) => None,
        };
        Ok(text.filter(|q| !q.trim().is_empty()))
    }
}
