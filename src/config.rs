use crate::error::{Error, Result};
use crate::filter::FileFilterConfig;
use crate::macros::DEFAULT_DENYLIST;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MACROS_PATH: &str = "macros_used.txt";
pub(crate) const DEFAULT_OUTPUT_PATTERN: &str = "latex_reference_{model}_{timestamp}.md";
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_TOKENS: u32 = 4_000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_TEMPERATURE: f32 = 2.0;

/// Configuration for the macro scan.
///
/// Use [`ScanConfig::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ScanConfig {
    /// Root directory of the book
    pub root_dir: PathBuf,

    /// Sub-directories of the root to scan; empty scans the whole root
    pub include_dirs: Vec<PathBuf>,

    /// File receiving the macro list
    pub output_path: PathBuf,

    /// Glob filters
    pub file_filter_config: FileFilterConfig,

    /// Tokens dropped by the cleaning pass
    pub denylist: BTreeSet<String>,

    /// Honour `.gitignore` files
    pub respect_gitignore: bool,

    /// Dry run mode (no file writes)
    pub dry_run: bool,

    /// Keep a timestamped copy of the previous list
    pub backup_existing: bool,
}

impl ScanConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use texref::ScanConfig;
    ///
    /// let config = ScanConfig::builder()
    ///     .root_dir("./book")
    ///     .include_dirs(vec!["unit1".into(), "unit2".into()])
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory is missing or not a directory,
    /// or if the output path is empty.
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.exists() {
            return Err(Error::config(format!(
                "Root directory does not exist: {}",
                self.root_dir.display()
            )));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::config(format!(
                "Root path is not a directory: {}",
                self.root_dir.display()
            )));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(Error::config("output_path must not be empty"));
        }

        Ok(())
    }
}

/// Builder for creating a [`ScanConfig`].
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    root_dir: Option<PathBuf>,
    include_dirs: Vec<PathBuf>,
    output_path: Option<PathBuf>,
    file_filter_config: Option<FileFilterConfig>,
    denylist: Option<BTreeSet<String>>,
    keep: Vec<String>,
    reference_patterns: Vec<String>,
    respect_gitignore: Option<bool>,
    dry_run: bool,
    backup_existing: bool,
}

impl ScanConfigBuilder {
    /// Sets the root directory of the book.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Restricts the scan to these sub-directories of the root.
    #[must_use]
    pub fn include_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.include_dirs = dirs;
        self
    }

    /// Sets the macro list file.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the glob filters.
    #[must_use]
    pub fn file_filter_config(mut self, config: FileFilterConfig) -> Self {
        self.file_filter_config = Some(config);
        self
    }

    /// Replaces the default cleaning denylist.
    #[must_use]
    pub fn denylist<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Removes tokens from the denylist so they survive cleaning.
    #[must_use]
    pub fn keep<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Skips files produced by a reference output pattern other than the
    /// default one, which is always skipped.
    #[must_use]
    pub fn reference_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.reference_patterns.push(pattern.into());
        self
    }

    /// Enables or disables `.gitignore` handling.
    #[must_use]
    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = Some(enabled);
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables or disables backup creation.
    #[must_use]
    pub fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<ScanConfig> {
        let mut denylist = self.denylist.unwrap_or_else(|| DEFAULT_DENYLIST.clone());
        for token in &self.keep {
            denylist.remove(token);
        }

        let config = ScanConfig {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            include_dirs: self.include_dirs,
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MACROS_PATH)),
            file_filter_config: self
                .reference_patterns
                .iter()
                .fold(self.file_filter_config.unwrap_or_default(), |filter, pattern| {
                    filter.exclude_output_pattern(pattern)
                }),
            denylist,
            respect_gitignore: self.respect_gitignore.unwrap_or(true),
            dry_run: self.dry_run,
            backup_existing: self.backup_existing,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Remote API flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiKind {
    /// Chat completions endpoint (`/chat/completions`)
    #[default]
    Chat,
    /// Legacy text completions endpoint (`/completions`)
    Completions,
}

impl ApiKind {
    /// Sampling temperature used when none is configured.
    #[must_use]
    pub const fn default_temperature(self) -> f32 {
        match self {
            Self::Chat => 0.5,
            Self::Completions => 1.0,
        }
    }

    /// Endpoint path relative to the base URL.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Chat => "chat/completions",
            Self::Completions => "completions",
        }
    }
}

/// Where the reference document is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Fixed path
    Path(PathBuf),
    /// Filename pattern supporting `{model}` and `{timestamp}`
    Pattern(String),
}

impl OutputTarget {
    /// Resolves the target into a path.
    ///
    /// `{timestamp}` is the local time formatted as `%Y-%m-%d_%H-%M`.
    #[must_use]
    pub fn resolve(&self, model: &str) -> PathBuf {
        match self {
            Self::Path(path) => path.clone(),
            Self::Pattern(pattern) => {
                let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M").to_string();
                PathBuf::from(
                    pattern
                        .replace("{model}", &sanitize_model(model))
                        .replace("{timestamp}", &timestamp),
                )
            }
        }
    }
}

/// Turns an output pattern into a glob matching every file it can produce.
///
/// `latex_reference_{model}_{timestamp}.md` -> `**/latex_reference_*_*.md`
pub(crate) fn pattern_glob(pattern: &str) -> String {
    let glob = pattern.replace("{model}", "*").replace("{timestamp}", "*");
    if glob.starts_with('/') || glob.starts_with("**/") {
        glob
    } else {
        format!("**/{}", glob.trim_start_matches("./"))
    }
}

/// Model names may contain `/` (e.g. routed providers); keep filenames flat.
fn sanitize_model(model: &str) -> String {
    model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

/// Configuration for the reference generator.
///
/// Use [`GenerateConfig::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GenerateConfig {
    /// Macro list written by the scan
    pub macros_path: PathBuf,

    /// Reference document destination
    pub output: OutputTarget,

    /// Model name
    pub model: String,

    /// API flavour
    pub api_kind: ApiKind,

    /// API base URL
    pub base_url: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token limit (legacy completions API only)
    pub max_tokens: u32,

    /// What the book is about, mentioned in the prompt
    pub subject: Option<String>,

    /// External system prompt template
    pub template_path: Option<PathBuf>,

    /// Request timeout
    pub timeout: Duration,

    /// Render the prompt without calling the service
    pub dry_run: bool,

    /// Keep a timestamped copy of a previous document at the same path
    pub backup_existing: bool,
}

impl GenerateConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use texref::GenerateConfig;
    ///
    /// let config = GenerateConfig::builder()
    ///     .macros_path("macros_used.txt")
    ///     .output_path("latex_reference.md")
    ///     .model("gpt-4")
    ///     .subject("a Bayesian statistics class")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> GenerateConfigBuilder {
        GenerateConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model name is empty
    /// - The base URL is not a valid URL
    /// - The temperature is outside `0.0..=2.0`
    /// - The output pattern is empty
    /// - The template file is missing or invalid
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }

        reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("Invalid base URL '{}': {e}", self.base_url)))?;

        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature ({}) must be between 0 and {MAX_TEMPERATURE}",
                self.temperature
            )));
        }

        if self.max_tokens == 0 {
            return Err(Error::config("max_tokens must be greater than 0"));
        }

        match &self.output {
            OutputTarget::Pattern(pattern) if pattern.trim().is_empty() => {
                return Err(Error::config("output pattern must not be empty"));
            }
            OutputTarget::Path(path) if path.as_os_str().is_empty() => {
                return Err(Error::config("output path must not be empty"));
            }
            _ => {}
        }

        if let Some(ref template_path) = self.template_path {
            crate::prompt::validate_template(template_path)?;
        }

        Ok(())
    }

    /// Returns the resolved output path for this run.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output.resolve(&self.model)
    }

    /// Returns the full endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_kind.endpoint()
        )
    }
}

/// Builder for creating a [`GenerateConfig`].
#[derive(Debug, Default)]
pub struct GenerateConfigBuilder {
    macros_path: Option<PathBuf>,
    output: Option<OutputTarget>,
    model: Option<String>,
    api_kind: Option<ApiKind>,
    base_url: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    subject: Option<String>,
    template_path: Option<PathBuf>,
    timeout: Option<Duration>,
    dry_run: bool,
    backup_existing: bool,
}

impl GenerateConfigBuilder {
    /// Sets the macro list file.
    #[must_use]
    pub fn macros_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.macros_path = Some(path.into());
        self
    }

    /// Writes the reference document to a fixed path.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(OutputTarget::Path(path.into()));
        self
    }

    /// Derives the output filename from a pattern with `{model}` and
    /// `{timestamp}` placeholders.
    #[must_use]
    pub fn output_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.output = Some(OutputTarget::Pattern(pattern.into()));
        self
    }

    /// Sets the model name.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API flavour.
    #[must_use]
    pub fn api_kind(mut self, kind: ApiKind) -> Self {
        self.api_kind = Some(kind);
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the completion token limit.
    #[must_use]
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Describes the book, e.g. "a Bayesian statistics class".
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the path to an external system prompt template.
    #[must_use]
    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enables dry run mode (prompt only).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables or disables backup creation.
    #[must_use]
    pub fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<GenerateConfig> {
        let api_kind = self.api_kind.unwrap_or_default();

        let config = GenerateConfig {
            macros_path: self
                .macros_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MACROS_PATH)),
            output: self
                .output
                .unwrap_or_else(|| OutputTarget::Pattern(DEFAULT_OUTPUT_PATTERN.to_string())),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_kind,
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            temperature: self
                .temperature
                .unwrap_or_else(|| api_kind.default_temperature()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            subject: self.subject.filter(|s| !s.trim().is_empty()),
            template_path: self.template_path,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            dry_run: self.dry_run,
            backup_existing: self.backup_existing,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Returns true if `path` has a `.md` extension.
pub(crate) fn is_markdown_path(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("md")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_default_scan_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = ScanConfig::builder().root_dir(temp.path()).build().unwrap();

        assert_eq!(config.output_path, PathBuf::from(DEFAULT_MACROS_PATH));
        assert!(config.include_dirs.is_empty());
        assert!(config.respect_gitignore);
        assert!(!config.backup_existing);
        assert_eq!(config.denylist, *DEFAULT_DENYLIST);
    }

    #[test]
    fn test_invalid_root_dir() {
        let result = ScanConfig::builder()
            .root_dir("/nonexistent/path/that/should/not/exist")
            .build();

        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_root_dir_is_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("intro.md");
        file.write_str("x").unwrap();

        let result = ScanConfig::builder().root_dir(file.path()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_keep_removes_from_denylist() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = ScanConfig::builder()
            .root_dir(temp.path())
            .keep(["\\t"])
            .build()
            .unwrap();

        assert!(!config.denylist.contains("\\t"));
        assert!(config.denylist.contains("\\{"));
    }

    #[test]
    fn test_custom_denylist() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = ScanConfig::builder()
            .root_dir(temp.path())
            .denylist(["\\_", "\\*"])
            .build()
            .unwrap();

        assert_eq!(config.denylist.len(), 2);
    }

    #[test]
    fn test_default_generate_config() {
        let config = GenerateConfig::builder().build().unwrap();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_kind, ApiKind::Chat);
        assert!((config.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.endpoint_url(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_completions_defaults() {
        let config = GenerateConfig::builder()
            .api_kind(ApiKind::Completions)
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();

        assert!((config.temperature - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.endpoint_url(), "http://localhost:8080/v1/completions");
    }

    #[test]
    fn test_invalid_temperature() {
        let result = GenerateConfig::builder().temperature(2.5).build();
        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GenerateConfig::builder().base_url("not a url").build();
        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_empty_model() {
        let result = GenerateConfig::builder().model("  ").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_subject_is_dropped() {
        let config = GenerateConfig::builder().subject(" ").build().unwrap();
        assert!(config.subject.is_none());
    }

    #[test]
    fn test_output_pattern_resolution() {
        let target = OutputTarget::Pattern("latex_reference_{model}_{timestamp}.md".to_string());
        let path = target.resolve("openai/gpt-4o");
        let name = path.to_string_lossy().to_string();

        assert!(name.starts_with("latex_reference_openai_gpt-4o_"));
        assert!(name.ends_with(".md"));
        assert!(!name.contains('{'));
    }

    #[test]
    fn test_pattern_glob() {
        assert_eq!(pattern_glob(DEFAULT_OUTPUT_PATTERN), "**/latex_reference_*_*.md");
        assert_eq!(pattern_glob("./refs/{model}.md"), "**/refs/*.md");
        assert_eq!(pattern_glob("/tmp/ref_{timestamp}.md"), "/tmp/ref_*.md");
    }

    #[test]
    fn test_output_path_is_fixed() {
        let config = GenerateConfig::builder()
            .output_path("reference.md")
            .build()
            .unwrap();

        assert_eq!(config.output_path(), PathBuf::from("reference.md"));
    }

    #[test]
    fn test_missing_template() {
        let result = GenerateConfig::builder()
            .template_path("/nonexistent/system.tera")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_is_markdown_path() {
        assert!(is_markdown_path(Path::new("reference.md")));
        assert!(!is_markdown_path(Path::new("reference.txt")));
    }
}
