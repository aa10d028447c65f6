//! Trending command handler.
//!
//! With a region and category, prints one bucket. With only a region,
//! prints every bucket of that region; with only a category, that category
//! across regions; with neither, every bucket.

use super::{open_runtime, print_json};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppResult};
use newsdesk_index::{Category, NewsRuntime, Region, TrendingDigest, TrendingGroup};
use serde::Serialize;

#[derive(Serialize)]
struct TrendingOutput<'a> {
    groups: &'a [TrendingGroup],
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<&'a TrendingDigest>,
}

/// Trending articles, per region and category
#[derive(Args, Debug)]
pub struct TrendingCommand {
    /// Region (India, Global, Other); all regions when omitted
    pub region: Option<String>,

    /// Category (Politics, Technology, Sports, Health, Crime, Entertainment, Other);
    /// all categories when omitted
    pub category: Option<String>,

    /// Restrict to one category without naming a region
    #[arg(long, conflicts_with = "category")]
    pub only: Option<String>,

    /// Also write a short LLM digest of the top stories (single bucket only)
    #[arg(long)]
    pub digest: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TrendingCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(
            "Executing trending command for {}/{}",
            self.region.as_deref().unwrap_or("*"),
            self.category
                .as_deref()
                .or(self.only.as_deref())
                .unwrap_or("*")
        );

        let runtime = open_runtime(config, self.digest)?;
        let groups = self.groups(&runtime)?;

        let digest = match (&self.region, &self.category) {
            (Some(region), Some(category)) if self.digest => {
                match runtime.service.trending_digest(region, category).await {
                    Ok(digest) => Some(digest),
                    Err(e) => {
                        tracing::warn!("Digest unavailable: {}", e);
                        None
                    }
                }
            }
            _ => {
                if self.digest {
                    tracing::warn!("--digest needs both a region and a category; skipping");
                }
                None
            }
        };

        if self.json {
            return print_json(&TrendingOutput {
                groups: &groups,
                digest: digest.as_ref(),
            });
        }

        if let Some(digest) = &digest {
            println!("{}", digest.summary);
            println!();
        }

        for (n, group) in groups.iter().enumerate() {
            if groups.len() > 1 {
                if n > 0 {
                    println!();
                }
                println!("== {} / {} ==", group.region, group.category);
            }
            if group.articles.is_empty() {
                println!("Nothing trending in {} / {}.", group.region, group.category);
            }
            for (i, article) in group.articles.iter().enumerate() {
                println!(
                    "{}. {} ({}, {})",
                    i + 1,
                    article.title,
                    article.source,
                    article.published_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        Ok(())
    }

    fn groups(&self, runtime: &NewsRuntime) -> AppResult<Vec<TrendingGroup>> {
        let service = &runtime.service;
        match (&self.region, &self.category) {
            (Some(region), Some(category)) => {
                let region: Region = region.parse()?;
                let category: Category = category.parse()?;
                Ok(vec![TrendingGroup {
                    region,
                    category,
                    articles: service.trending(region.as_str(), category.as_str())?,
                }])
            }
            (Some(region), None) => {
                let groups = service.trending_region(region)?;
                self.only_category(groups)
            }
            _ => self.only_category(service.trending_all()?),
        }
    }

    fn only_category(&self, groups: Vec<TrendingGroup>) -> AppResult<Vec<TrendingGroup>> {
        let Some(only) = &self.only else {
            return Ok(groups);
        };
        let category: Category = only.parse()?;
        Ok(groups
            .into_iter()
            .filter(|g| g.category == category)
            .collect())
    }
}
