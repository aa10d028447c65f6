//! Prompt system for newsdesk.
//!
//! Prompts are YAML definitions rendered with Handlebars. Two prompts ship
//! built in (`news.report` and `news.trending`); a workspace can override
//! either by dropping `<id>.yml` into `.newsdesk/prompts/`.

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use builtin::{builtin_prompt, REPORT_PROMPT_ID, TRENDING_PROMPT_ID};
pub use loader::{load_prompt, prompts_dir};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec};
