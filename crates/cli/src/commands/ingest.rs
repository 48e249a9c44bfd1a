//! Ingest command handler.

use clap::Args;
use placement_core::{config::AppConfig, AppResult};
use placement_knowledge::{initialize, IngestOptions};

use super::{embedder, print_json};

/// Load, chunk and embed the corpus into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Drop the persisted index before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");
        config.rag.validate()?;

        let options = IngestOptions::from_config(config).with_reset(self.reset);
        let (_index, stats) = initialize(&options, embedder(config)?).await?;

        if self.json {
            let output = serde_json::json!({
                "sourcesCount": stats.sources_count,
                "documentsCount": stats.documents_count,
                "chunksCount": stats.chunks_count,
                "embeddedCount": stats.embedded_count,
                "addedCount": stats.added_count,
                "entriesCount": stats.entries_count,
                "durationSecs": stats.duration_secs,
                "indexPath": options.index_path,
            });
            print_json(&output)?;
        } else {
            println!(
                "Ingested {} sources ({} documents, {} chunks) in {:.2}s",
                stats.sources_count, stats.documents_count, stats.chunks_count, stats.duration_secs
            );
            println!(
                "  Embedded: {}  New: {}  Index entries: {}",
                stats.embedded_count, stats.added_count, stats.entries_count
            );
        }

        Ok(())
    }
}
