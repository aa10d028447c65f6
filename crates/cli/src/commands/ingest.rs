//! Ingest command handler.

use super::{open_runtime, print_json};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppResult};
use newsdesk_index::{ingest, ArticleSource, BatchFileSource, JsonDirSource};
use std::path::PathBuf;

/// Store a collector batch file (.json/.jsonl) or every batch in a directory
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Batch file or directory of batch files
    pub path: PathBuf,

    /// Move consumed directory files into processed/
    #[arg(long)]
    pub archive: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {:?}", self.path);

        let runtime = open_runtime(config, false)?;
        let source: Box<dyn ArticleSource> = if self.path.is_dir() {
            Box::new(JsonDirSource::new(&self.path).with_archive(self.archive))
        } else {
            Box::new(BatchFileSource::new(&self.path))
        };

        let stats = ingest(&runtime.store, source.as_ref(), &runtime.config.build).await?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!(
                "Stored {} of {} articles from {} files ({} rejected, {} malformed)",
                stats.accepted, stats.received, stats.files, stats.rejected, stats.malformed
            );
            println!("Run `newsdesk build` to make them searchable.");
        }

        Ok(())
    }
}
