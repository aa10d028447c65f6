//! Status command handler.

use super::{open_runtime, print_json};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppResult};

/// Show the active version, retained versions, and bucket sizes
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let runtime = open_runtime(config, false)?;
        let status = runtime.service.status()?;

        if self.json {
            return print_json(&status);
        }

        println!("Stored articles: {}", status.stored_articles);
        match &status.active {
            Some(active) => println!(
                "Active version:  {} ({} articles, built {}, {})",
                active.version_id,
                active.article_count,
                active.built_at.format("%Y-%m-%d %H:%M:%S"),
                active.fingerprint
            ),
            None => println!("Active version:  none (run `newsdesk build`)"),
        }

        if !status.retained.is_empty() {
            let ids: Vec<String> = status
                .retained
                .iter()
                .map(|v| v.version_id.to_string())
                .collect();
            println!("Rollback targets: {}", ids.join(", "));
        }

        if !status.buckets.is_empty() {
            println!();
            println!("Trending buckets:");
            for bucket in &status.buckets {
                println!("  {:<8} {:<14} {}", bucket.region, bucket.category, bucket.size);
            }
        }

        Ok(())
    }
}
