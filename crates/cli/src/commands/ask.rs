//! Ask command handler.
//!
//! Searches, then asks the configured LLM for a report that cites the
//! returned articles. Without a working LLM a plain summary of the ranked
//! articles is printed instead.

use super::{open_runtime, print_json, FilterArgs};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppResult};

/// Search and write a cited report
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to answer
    pub query: String,

    /// Maximum number of articles to read
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask options: {:?}", self);

        let filters = self.filters.to_filters()?;
        let runtime = open_runtime(config, true)?;
        let answer = runtime
            .service
            .ask(&self.query, self.max_results, &filters)
            .await?;

        if self.json {
            return print_json(&answer);
        }

        if let Some(reason) = &answer.degraded_reason {
            eprintln!("No synthesized report ({}); showing a plain summary.", reason);
        }

        let report = &answer.report;
        println!("{}", report.answer);
        println!();
        if report.citations.is_empty() {
            println!("Sources: (no sources available)");
        } else {
            println!("Sources:");
            for citation in &report.citations {
                println!(
                    "[{}] {} ({}, {}) {}",
                    citation.number,
                    citation.title,
                    citation.source,
                    citation.published_at.format("%Y-%m-%d"),
                    citation.url
                );
            }
        }

        Ok(())
    }
}
