//! Stats command handler.

use clap::Args;
use placement_core::{config::AppConfig, AppResult};

use super::print_json;

/// Show persisted index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index_path = config.index_path();
        let stats = placement_knowledge::index_stats(&index_path)?;

        if self.json {
            let output = serde_json::json!({
                "indexPath": index_path,
                "sourcesCount": stats.sources_count,
                "chunksCount": stats.chunks_count,
                "embeddingProvider": stats.embedding_provider,
                "embeddingModel": stats.embedding_model,
                "dimensions": stats.dimensions,
                "dbSizeBytes": stats.db_size_bytes,
                "lastIngestAt": stats.last_ingest_at,
            });
            print_json(&output)?;
        } else {
            println!("Index: {}", index_path.display());
            println!("  Sources: {}", stats.sources_count);
            println!("  Chunks: {}", stats.chunks_count);
            if let (Some(provider), Some(model)) = (&stats.embedding_provider, &stats.embedding_model) {
                println!(
                    "  Embeddings: {} / {} ({} dims)",
                    provider,
                    model,
                    stats.dimensions.unwrap_or(0)
                );
            }
            println!("  DB size: {} bytes", stats.db_size_bytes);
            if let Some(last) = &stats.last_ingest_at {
                println!("  Last ingest: {}", last);
            }
        }

        Ok(())
    }
}
