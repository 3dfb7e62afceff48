use crate::{
    client::{CompletionClient, OpenAiClient},
    config::{GenerateConfig, is_markdown_path},
    credentials::CredentialSource,
    error::{Error, Result},
    macros::MacroSet,
    prompt::{Prompt, PromptBuilder},
    writer::Writer,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Statistics collected during a generator run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    /// Macros sent to the service
    pub macros: usize,

    /// Prompt size in bytes
    pub prompt_bytes: usize,

    /// Response size in bytes (0 for a dry run)
    pub response_bytes: usize,

    /// Reference document path
    pub output_path: String,

    /// Whether the document was written
    pub written: bool,

    /// Total execution time
    pub duration: Duration,
}

/// Turns the macro list into a reference document with one remote call.
pub struct ReferenceGenerator {
    config: GenerateConfig,
    prompt_builder: PromptBuilder,
    client: Box<dyn CompletionClient>,
    writer: Writer,
}

impl ReferenceGenerator {
    /// Creates a generator backed by [`OpenAiClient`].
    ///
    /// The key is loaded here, so a missing credential fails before any
    /// file is read or request is sent. Dry runs skip the credential.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The credential source yields no valid key
    /// - The prompt templates do not compile
    pub fn new(config: GenerateConfig, credentials: &dyn CredentialSource) -> Result<Self> {
        config.validate()?;

        if config.dry_run {
            debug!("Dry run: not loading credentials");
            return Self::with_client(config, Box::new(DryRunClient));
        }

        debug!("Loading API key from {}", credentials.describe());
        let api_key = credentials.load()?;
        let client = OpenAiClient::new(&config, api_key)?;

        Self::with_client(config, Box::new(client))
    }

    /// Creates a generator around any completion backend.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails or the prompt
    /// templates do not compile.
    pub fn with_client(config: GenerateConfig, client: Box<dyn CompletionClient>) -> Result<Self> {
        config.validate()?;

        let prompt_builder = PromptBuilder::new(&config)?;
        let writer = Writer::new(config.backup_existing);

        Ok(Self {
            config,
            prompt_builder,
            client,
            writer,
        })
    }

    /// Renders the prompt for the configured macro list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be read, is empty, or the prompt
    /// fails to render.
    pub fn prompt(&self) -> Result<(MacroSet, Prompt)> {
        let path = &self.config.macros_path;
        let macros = MacroSet::load(path)?;

        if macros.is_empty() {
            return Err(Error::empty_macro_list(path));
        }

        let prompt = self.prompt_builder.build(&macros)?;
        Ok((macros, prompt))
    }

    /// Executes the generator and returns statistics.
    ///
    /// The response is written verbatim; nothing checks its structure.
    ///
    /// # Errors
    ///
    /// Returns an error if the macro list is missing or empty, the remote
    /// call fails, or the document cannot be written.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use texref::{EnvCredentials, GenerateConfig, ReferenceGenerator};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = GenerateConfig::builder()
    ///     .macros_path("macros_used.txt")
    ///     .output_path("latex_reference.md")
    ///     .build()?;
    ///
    /// ReferenceGenerator::new(config, &EnvCredentials::default())?.run()?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(model = %self.config.model))]
    pub fn run(&self) -> Result<GenerateReport> {
        let start_time = Instant::now();
        let output_path = self.config.output_path();

        info!("Stage 1/3: Building prompt...");
        let (macros, prompt) = self.prompt()?;
        info!(
            "✓ Prompt for {} macros ({} bytes)",
            macros.len(),
            prompt.size()
        );

        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping remote call and file writes");
            println!("{}\n\n{}", prompt.system, prompt.user);
            return Ok(GenerateReport {
                macros: macros.len(),
                prompt_bytes: prompt.size(),
                response_bytes: 0,
                output_path: output_path.display().to_string(),
                written: false,
                duration: start_time.elapsed(),
            });
        }

        info!("Stage 2/3: Requesting reference from {}...", self.config.model);
        let call_start = Instant::now();
        let response = self.client.complete(&prompt)?;
        info!(
            "✓ Received {} bytes in {:.2}s",
            response.len(),
            call_start.elapsed().as_secs_f64()
        );

        if response.trim().is_empty() {
            warn!("The service returned an empty reference");
        }

        if !is_markdown_path(&output_path) {
            warn!("Output path {} has no .md extension", output_path.display());
        }

        info!("Stage 3/3: Writing {}...", output_path.display());
        self.writer.write(&output_path, &response)?;

        Ok(GenerateReport {
            macros: macros.len(),
            prompt_bytes: prompt.size(),
            response_bytes: response.len(),
            output_path: output_path.display().to_string(),
            written: true,
            duration: start_time.elapsed(),
        })
    }
}

/// Placeholder backend for dry runs; `run` returns before calling it.
struct DryRunClient;

impl CompletionClient for DryRunClient {
    fn complete(&self, _prompt: &Prompt) -> Result<String> {
        Err(Error::config("dry run does not call the remote service"))
    }
}
