//! Prompts that ship with the binary.
//!
//! Template variables:
//! - `news.report`: `query`, `articles[]` with `number`, `title`, `source`,
//!   `published`, `body`
//! - `news.trending`: `region`, `category`, `stories[]` with `title`, `source`

use crate::types::PromptDefinition;

/// Prompt used to synthesize a cited report from search results.
pub const REPORT_PROMPT_ID: &str = "news.report";

/// Prompt used to write a short digest of a trending bucket.
pub const TRENDING_PROMPT_ID: &str = "news.trending";

const REPORT_YAML: &str = r#"
id: news.report
title: Cited News Report
apiVersion: "1.0"
createdBy: newsdesk
system: >-
  You are a senior news reporter. Answer only from the numbered articles you
  are given and never invent facts.
template: |
  User Query: {{query}}

  Synthesize the information from the following articles into a concise report
  that directly answers the query.
  - Start with a headline-style summary.
  - Then give 2-4 short paragraphs covering the key events and findings.
  - Refer to articles by their number, for example [2].
  - End with a line listing the articles you used, for example "Sources: 1, 2".

  Articles:
  ---
  {{#each articles}}
  Source {{number}} ({{source}}, {{published}}): {{title}}
  {{body}}

  {{/each}}
  ---

  Your Final Report:
output:
  format: markdown
  maxTokens: 1024
  temperature: 0.3
"#;

const TRENDING_YAML: &str = r#"
id: news.trending
title: Trending Digest
apiVersion: "1.0"
createdBy: newsdesk
template: |
  Create a brief trending news summary for {{category}} news in {{region}}.

  Top stories:
  {{#each stories}}
  - {{title}} ({{source}})
  {{/each}}

  Write a 2-3 sentence summary highlighting the key trends and developments.
  Be concise and informative.
output:
  format: text
  maxTokens: 256
  temperature: 0.4
"#;

/// Look up a built-in prompt by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let yaml = match id {
        REPORT_PROMPT_ID => REPORT_YAML,
        TRENDING_PROMPT_ID => TRENDING_YAML,
        _ => return None,
    };

    match serde_yaml::from_str(yaml) {
        Ok(definition) => Some(definition),
        Err(e) => {
            tracing::error!("Built-in prompt {} failed to parse: {}", id, e);
            None
        }
    }
}
