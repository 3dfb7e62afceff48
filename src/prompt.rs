use crate::{
    config::GenerateConfig,
    error::{Error, Result},
    macros::MacroSet,
};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

/// Maximum template file size (1MB)
const MAX_TEMPLATE_SIZE: u64 = 1024 * 1024;

const SYSTEM_TEMPLATE: &str = "system";
const USER_TEMPLATE: &str = "user";

/// The rendered request: instructions plus the macro list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Instructions describing the reference format
    pub system: String,
    /// Message carrying the macro list
    pub user: String,
}

impl Prompt {
    /// Both parts as a single prompt, for APIs without message roles.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system.trim_end(), self.user)
    }

    /// Total size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.system.len() + self.user.len()
    }
}

#[derive(Serialize)]
struct PromptContext<'a> {
    macros: Vec<&'a str>,
    macro_count: usize,
    subject: Option<&'a str>,
}

/// Renders prompts from the built-in or a user-supplied template.
pub struct PromptBuilder {
    tera: Tera,
    subject: Option<String>,
}

impl PromptBuilder {
    /// Creates a builder from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a template cannot be read or compiled.
    pub fn new(config: &GenerateConfig) -> Result<Self> {
        let mut tera = Tera::default();

        match &config.template_path {
            Some(path) => {
                validate_template(path)?;
                let content = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
                tera.add_raw_template(SYSTEM_TEMPLATE, &content)
                    .map_err(|e| Error::template(path.display().to_string(), e))?;
            }
            None => {
                tera.add_raw_template(SYSTEM_TEMPLATE, include_str!("../templates/system.tera"))
                    .map_err(|e| Error::template(SYSTEM_TEMPLATE, e))?;
            }
        }

        tera.add_raw_template(USER_TEMPLATE, include_str!("../templates/user.tera"))
            .map_err(|e| Error::template(USER_TEMPLATE, e))?;

        Ok(Self {
            tera,
            subject: config.subject.clone(),
        })
    }

    /// Renders the prompt for `macros`. Every token appears verbatim, one per line.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn build(&self, macros: &MacroSet) -> Result<Prompt> {
        let ctx = PromptContext {
            macros: macros.iter().collect(),
            macro_count: macros.len(),
            subject: self.subject.as_deref(),
        };
        let context = Context::from_serialize(&ctx)?;

        let system = self
            .tera
            .render(SYSTEM_TEMPLATE, &context)
            .map_err(|e| Error::template(SYSTEM_TEMPLATE, e))?;
        let user = self
            .tera
            .render(USER_TEMPLATE, &context)
            .map_err(|e| Error::template(USER_TEMPLATE, e))?;

        Ok(Prompt { system, user })
    }
}

/// Validates an external system prompt template.
///
/// Checks that the file exists, is at most 1MB, is not blank and compiles.
///
/// # Errors
///
/// Returns an error describing the first failed check.
pub(crate) fn validate_template(path: &Path) -> Result<()> {
    let name = path.display().to_string();

    if !path.is_file() {
        return Err(Error::config(format!(
            "Template file does not exist: {name}"
        )));
    }

    let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
    if metadata.len() > MAX_TEMPLATE_SIZE {
        return Err(Error::template(
            name,
            format!(
                "Template file too large: {} bytes (max: {MAX_TEMPLATE_SIZE} bytes)",
                metadata.len()
            ),
        ));
    }

    let content = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    if content.trim().is_empty() {
        return Err(Error::template(name, "Template file is empty"));
    }

    Tera::default()
        .add_raw_template("validation", &content)
        .map_err(|e| Error::template(name, format!("Template syntax error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn macros() -> MacroSet {
        MacroSet::parse("\\alpha\n\\beta\n")
    }

    #[test]
    fn test_builtin_prompt_contains_every_macro() {
        let config = GenerateConfig::builder().build().unwrap();
        let prompt = PromptBuilder::new(&config).unwrap().build(&macros()).unwrap();

        assert!(prompt.user.contains("\\alpha\n\\beta\n"));
        assert!(prompt.user.contains("The following 2 LaTeX macros"));
        assert!(prompt.user.contains("a Jupyter Book"));
        assert!(prompt.system.contains("Greek Letters"));
        assert!(prompt.system.contains("$\\macro$"));
    }

    #[test]
    fn test_subject_is_mentioned() {
        let config = GenerateConfig::builder()
            .subject("a Bayesian statistics class")
            .build()
            .unwrap();
        let prompt = PromptBuilder::new(&config).unwrap().build(&macros()).unwrap();

        assert!(prompt.system.contains("taken from a Bayesian statistics class"));
        assert!(prompt.user.contains("used in a Bayesian statistics class"));
    }

    #[test]
    fn test_custom_system_template() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template = temp.child("system.tera");
        template
            .write_str("List {{ macro_count }} macros as a table.")
            .unwrap();

        let config = GenerateConfig::builder()
            .template_path(template.path())
            .build()
            .unwrap();
        let prompt = PromptBuilder::new(&config).unwrap().build(&macros()).unwrap();

        assert_eq!(prompt.system, "List 2 macros as a table.");
        assert!(prompt.user.contains("\\beta"));
    }

    #[test]
    fn test_combined_prompt() {
        let prompt = Prompt {
            system: "Instructions.\n".to_string(),
            user: "\\alpha\n".to_string(),
        };

        assert_eq!(prompt.combined(), "Instructions.\n\n\\alpha\n");
        assert_eq!(prompt.size(), 21);
    }

    #[test]
    fn test_validate_nonexistent_file() {
        let err = validate_template(Path::new("/nonexistent/template.tera")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_validate_empty_template() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("empty.tera");
        template_file.write_str("   \n  \n  ").unwrap();

        let err = validate_template(template_file.path()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_validate_syntax_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("invalid.tera");
        template_file
            .write_str("{% if subject %}\nUnclosed if")
            .unwrap();

        let err = validate_template(template_file.path()).unwrap_err();
        assert!(err.to_string().contains("Template syntax error"));
    }

    #[test]
    fn test_validate_file_too_large() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("large.tera");
        let large_content = "x".repeat((MAX_TEMPLATE_SIZE + 1) as usize);
        template_file.write_str(&large_content).unwrap();

        let err = validate_template(template_file.path()).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
