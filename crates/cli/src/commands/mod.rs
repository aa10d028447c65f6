//! Command handlers for the newsdesk CLI.
//!
//! Each subcommand lives in its own module; the helpers here open the
//! workspace runtime and shape shared arguments.

pub mod ask;
pub mod build;
pub mod ingest;
pub mod search;
pub mod serve;
pub mod status;
pub mod trending;

pub use ask::AskCommand;
pub use build::BuildCommand;
pub use ingest::IngestCommand;
pub use search::SearchCommand;
pub use serve::ServeCommand;
pub use status::StatusCommand;
pub use trending::TrendingCommand;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppError, AppResult};
use newsdesk_index::{NewsRuntime, SearchFilters};
use newsdesk_llm::{create_client, LlmClient, RetryPolicy};
use serde::Serialize;
use std::sync::Arc;

/// Build the report LLM client, or `None` to run search-only.
///
/// A misconfigured provider is logged and treated as absent so search keeps
/// working.
pub fn llm_client(config: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    let api_key = config.resolve_api_key(&config.provider);
    match create_client(
        &config.provider,
        config.provider_endpoint(),
        api_key.as_deref(),
        RetryPolicy::default(),
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!("Reports unavailable: {}", e);
            None
        }
    }
}

/// Open the workspace runtime. `with_llm` wires the report client.
pub fn open_runtime(config: &AppConfig, with_llm: bool) -> AppResult<NewsRuntime> {
    let llm = if with_llm { llm_client(config) } else { None };
    NewsRuntime::open(&config.workspace, llm, &config.model)
}

pub fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
    println!("{}", output);
    Ok(())
}

/// Filter flags shared by `search` and `ask`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only articles from this region (India, Global, Other)
    #[arg(long)]
    pub region: Option<String>,

    /// Only articles in this category (Politics, Technology, Sports, ...)
    #[arg(long)]
    pub category: Option<String>,

    /// Only articles published at or after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub after: Option<String>,

    /// Only articles published at or before this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub before: Option<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> AppResult<SearchFilters> {
        let mut filters = SearchFilters::new();
        if let Some(region) = &self.region {
            filters = filters.with_region(region.as_str());
        }
        if let Some(category) = &self.category {
            filters = filters.with_category(category.as_str());
        }
        if let Some(after) = &self.after {
            filters = filters.with_published_after(parse_date(after, false)?);
        }
        if let Some(before) = &self.before {
            filters = filters.with_published_before(parse_date(before, true)?);
        }
        Ok(filters)
    }
}

/// Parse an RFC 3339 timestamp or a bare date. A bare date covers the whole
/// day, so `end_of_day` picks its last second.
fn parse_date(value: &str, end_of_day: bool) -> AppResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidFilter(format!("unrecognized date: {}", value)))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| AppError::InvalidFilter(format!("unrecognized date: {}", value)))
}
