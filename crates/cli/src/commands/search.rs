//! Search command handler.

use super::{open_runtime, print_json, FilterArgs};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppResult};

/// Semantic search over the active index
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Free-text query
    pub query: String,

    /// Maximum number of results
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");
        tracing::debug!("Search options: {:?}", self);

        let filters = self.filters.to_filters()?;
        let runtime = open_runtime(config, false)?;
        let results = runtime
            .service
            .search(&self.query, self.max_results, &filters)
            .await?;

        if self.json {
            return print_json(&results);
        }

        if results.is_empty() {
            println!("No matching articles.");
            return Ok(());
        }

        for (i, scored) in results.iter().enumerate() {
            let article = &scored.article;
            println!(
                "{}. [{:.3}] {} ({}, {})",
                i + 1,
                scored.score,
                article.title,
                article.source,
                article.published_at.format("%Y-%m-%d")
            );
            println!("   {} / {}  {}", article.region, article.category, article.url);
        }

        Ok(())
    }
}
