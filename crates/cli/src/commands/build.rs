//! Build command handler.

use super::{open_runtime, print_json};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppResult};

/// Run one build cycle: ingest the inbox, build, promote
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing build command");

        let runtime = open_runtime(config, false)?;
        let report = runtime.scheduler.run_once().await?;

        if self.json {
            return print_json(&report);
        }

        if let Some(ingest) = &report.ingest {
            println!(
                "Ingested {} new articles from {} inbox files",
                ingest.accepted, ingest.files
            );
        }

        let build = &report.build;
        println!(
            "Built version {}: {} articles ({} reused, {} embedded, {} failed) in {:.2}s",
            build.version_id,
            build.articles,
            build.reused,
            build.embedded,
            build.failed,
            build.duration_secs
        );

        match report.rolled_back_to {
            Some(restored) => println!(
                "Version {} failed its health check; version {} is serving",
                build.version_id, restored
            ),
            None => println!("Version {} is now active", build.version_id),
        }

        Ok(())
    }
}
