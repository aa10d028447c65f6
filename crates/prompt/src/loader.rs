//! Prompt loader: workspace overrides first, then built-ins.

use crate::builtin::builtin_prompt;
use crate::types::PromptDefinition;
use newsdesk_core::config::STATE_DIR;
use newsdesk_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Directory holding prompt overrides for a workspace.
pub fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID.
///
/// A file named `<id>.yml` in `.newsdesk/prompts/` wins over the built-in
/// prompt of the same id. Unknown ids with no override file are an error.
///
/// # Example
/// ```no_run
/// use newsdesk_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "news.report")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        return builtin_prompt(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not found: {}", prompt_id)));
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        tracing::warn!(
            "Prompt file {:?} declares id {} but was loaded as {}",
            prompt_file,
            definition.id,
            prompt_id
        );
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::REPORT_PROMPT_ID;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, content: &str) {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_builtin_used_without_override() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), REPORT_PROMPT_ID).unwrap();
        assert_eq!(prompt.id, REPORT_PROMPT_ID);
        assert_eq!(prompt.title, "Cited News Report");
    }

    #[test]
    fn test_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            REPORT_PROMPT_ID,
            r#"
id: news.report
title: Terse Report
apiVersion: "1.1"
template: "Answer {{query}} briefly."
"#,
        );

        let prompt = load_prompt(temp_dir.path(), REPORT_PROMPT_ID).unwrap();
        assert_eq!(prompt.title, "Terse Report");
    }

    #[test]
    fn test_invalid_override_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), REPORT_PROMPT_ID, "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), REPORT_PROMPT_ID).is_err());
    }

    #[test]
    fn test_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            load_prompt(temp_dir.path(), "nonexistent"),
            Err(AppError::Prompt(_))
        ));
    }
}
