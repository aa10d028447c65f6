//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use newsdesk_core::{AppError, AppResult};
use serde::Serialize;

/// Render a prompt definition against a serializable context.
///
/// The system instruction and the template are both rendered, so either
/// may reference context variables.
///
/// # Example
/// ```no_run
/// use newsdesk_prompt::{build_prompt, builtin_prompt, REPORT_PROMPT_ID};
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(REPORT_PROMPT_ID).unwrap();
/// let built = build_prompt(&def, &json!({ "query": "monsoon", "articles": [] }))?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt<C: Serialize>(
    definition: &PromptDefinition,
    context: &C,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let handlebars = registry();

    let user = render(&handlebars, &definition.template, context)?;
    let system = definition
        .system
        .as_deref()
        .map(|system| render(&handlebars, system, context))
        .transpose()?;

    Ok(BuiltPrompt::new(definition, system, user))
}

fn registry() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
}

fn render<C: Serialize>(
    handlebars: &Handlebars<'_>,
    template: &str,
    context: &C,
) -> AppResult<String> {
    handlebars
        .render_template(template, context)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
