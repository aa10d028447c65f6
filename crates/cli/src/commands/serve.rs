//! Serve command handler.
//!
//! Keeps the index fresh: rebuilds every `schedule.interval_secs` until
//! Ctrl-C, then waits for the in-flight cycle to finish.

use clap::Args;
use newsdesk_core::{config::AppConfig, AppError, AppResult};
use newsdesk_index::{IndexConfig, NewsRuntime};
use std::sync::Arc;
use tokio::sync::watch;

/// Rebuild on a schedule until interrupted
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Override the rebuild interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let mut index_config = IndexConfig::load(&config.workspace)?;
        if let Some(secs) = self.interval {
            index_config.schedule.interval_secs = secs;
        }

        let runtime =
            NewsRuntime::open_with_config(&config.workspace, index_config, None, &config.model)?;

        tracing::info!(
            "Serving {:?}, rebuilding every {}s",
            runtime.workspace,
            runtime.config.schedule.interval_secs
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Arc::clone(&runtime.scheduler).spawn(shutdown_rx);

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown requested");
        let _ = shutdown_tx.send(true);

        handle
            .await
            .map_err(|e| AppError::Other(format!("Build scheduler task failed: {}", e)))?;

        println!("Stopped.");
        Ok(())
    }
}
