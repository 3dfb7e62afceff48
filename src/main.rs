use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use texref::{
    ApiKind, DEFAULT_KEY_VARS, EnvCredentials, FileFilterConfig, GenerateConfig, ScanConfig,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "texref",
    version,
    about = "Build a LaTeX reference sheet for a Jupyter Book",
    long_about = "Build a LaTeX reference sheet for a Jupyter Book.\n\n\
    `scan` collects the macros used in the book's .md and .ipynb files into a list. \
    `generate` sends that list to an OpenAI-compatible model and saves the reply \
    as a markdown reference.\n\n\
    USAGE EXAMPLES:\n  \
      # Collect macros from the unit folders of a book\n  \
      texref scan --dir ~/book --unit unit1 --unit unit2 --unit backmatter\n\n  \
      # Generate the reference with GPT-4\n  \
      CHATGPT_KEY=sk-... texref generate --subject \"a Bayesian statistics class\"\n\n  \
      # Preview the prompt without calling the API\n  \
      texref generate --dry-run"
)]
struct Cli {
    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect the LaTeX macros used in a book
    Scan(ScanArgs),
    /// Generate a markdown reference from a macro list
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// Root directory of the book (the current directory if omitted)
    #[arg(short, long, value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Macro list file to write
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Content sub-directory to scan (repeatable; default scans the whole root)
    #[arg(long = "unit", value_name = "DIR")]
    units: Vec<PathBuf>,

    /// Glob of directories to skip (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    excludes: Vec<String>,

    /// Keep a token the cleaning pass would drop, e.g. '\t' (repeatable)
    #[arg(long = "keep", value_name = "TOKEN")]
    keep: Vec<String>,

    /// Output pattern of generated references to skip, in addition to the
    /// default one (repeatable)
    #[arg(long = "reference-pattern", value_name = "PATTERN")]
    reference_patterns: Vec<String>,

    /// Scan files ignored by .gitignore too
    #[arg(long)]
    no_gitignore: bool,

    /// Keep a timestamped backup of the previous list
    #[arg(long)]
    backup: bool,

    /// Dry run (don't write files)
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Macro list written by `scan`
    #[arg(short, long, value_name = "FILE")]
    macros: Option<PathBuf>,

    /// Reference document path (instead of --pattern)
    #[arg(short, long, value_name = "FILE", conflicts_with = "pattern")]
    out: Option<PathBuf>,

    /// Output filename pattern, supports {model} and {timestamp}
    #[arg(long)]
    pattern: Option<String>,

    /// Model name
    #[arg(long, env = "TEXREF_MODEL")]
    model: Option<String>,

    /// API flavour
    #[arg(long, value_enum, default_value = "chat")]
    api: CliApi,

    /// API base URL
    #[arg(long, env = "TEXREF_BASE_URL")]
    base_url: Option<String>,

    /// Sampling temperature (default 0.5 for chat, 1.0 for completions)
    #[arg(long)]
    temperature: Option<f32>,

    /// Completion token limit (completions API only)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// What the book is about, e.g. "a Bayesian statistics class"
    #[arg(long)]
    subject: Option<String>,

    /// Custom Tera template for the instructions
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Environment variable holding the API key (repeatable, checked in order)
    #[arg(long = "key-env", value_name = "VAR")]
    key_env: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Keep a timestamped backup of an existing document
    #[arg(long)]
    backup: bool,

    /// Print the prompt without calling the API
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliApi {
    /// Chat completions endpoint
    Chat,
    /// Legacy text completions endpoint
    Completions,
}

impl From<CliApi> for ApiKind {
    fn from(api: CliApi) -> Self {
        match api {
            CliApi::Chat => Self::Chat,
            CliApi::Completions => Self::Completions,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Command::Scan(args) => run_scan(args),
        Command::Generate(args) => run_generate(args),
    }
}

fn run_scan(args: ScanArgs) -> anyhow::Result<()> {
    let config = scan_config(args)?;

    let report = texref::scan(config).context("Macro scan failed")?;
    report.print_summary();

    Ok(())
}

/// Maps the flags onto the builder; omitted flags keep the library defaults.
fn scan_config(args: ScanArgs) -> anyhow::Result<ScanConfig> {
    let mut builder = ScanConfig::builder()
        .include_dirs(args.units)
        .file_filter_config(FileFilterConfig::new().exclude_directories(args.excludes))
        .keep(args.keep)
        .respect_gitignore(!args.no_gitignore)
        .backup_existing(args.backup)
        .dry_run(args.dry_run);

    if let Some(dir) = args.dir {
        builder = builder.root_dir(dir);
    }

    if let Some(out) = args.out {
        builder = builder.output_path(out);
    }

    for pattern in args.reference_patterns {
        builder = builder.reference_pattern(pattern);
    }

    builder
        .build()
        .context("Failed to build scan configuration")
}

fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let (config, credentials) = generate_config(args)?;

    let report = texref::generate(config, &credentials).context("Reference generation failed")?;

    if report.written {
        println!("Wrote {} ({} macros)", report.output_path, report.macros);
    }

    Ok(())
}

/// Maps the flags onto the builder; omitted flags keep the library defaults.
fn generate_config(args: GenerateArgs) -> anyhow::Result<(GenerateConfig, EnvCredentials)> {
    let mut builder = GenerateConfig::builder()
        .api_kind(args.api.into())
        .backup_existing(args.backup)
        .dry_run(args.dry_run);

    if let Some(macros) = args.macros {
        builder = builder.macros_path(macros);
    }

    if let Some(pattern) = args.pattern {
        builder = builder.output_pattern(pattern);
    }

    if let Some(out) = args.out {
        builder = builder.output_path(out);
    }

    if let Some(model) = args.model {
        builder = builder.model(model);
    }

    if let Some(base_url) = args.base_url {
        builder = builder.base_url(base_url);
    }

    if let Some(max_tokens) = args.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }

    if let Some(timeout) = args.timeout {
        builder = builder.timeout(std::time::Duration::from_secs(timeout));
    }

    if let Some(temperature) = args.temperature {
        builder = builder.temperature(temperature);
    }

    if let Some(subject) = args.subject {
        builder = builder.subject(subject);
    }

    if let Some(template) = args.template {
        builder = builder.template_path(template);
    }

    let config = builder
        .build()
        .context("Failed to build generate configuration")?;

    let credentials = if args.key_env.is_empty() {
        EnvCredentials::new(DEFAULT_KEY_VARS.iter().copied())
    } else {
        EnvCredentials::new(args.key_env)
    };

    Ok((config, credentials))
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("texref=info"),
        1 => EnvFilter::new("texref=debug"),
        _ => EnvFilter::new("texref=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use texref::{CredentialSource, OutputTarget};

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_generate_flags_default_to_builder() {
        let Command::Generate(args) = parse(&["texref", "generate"]) else {
            panic!("expected generate");
        };
        let (config, credentials) = generate_config(args).unwrap();
        let defaults = GenerateConfig::builder().build().unwrap();

        assert_eq!(config.macros_path, defaults.macros_path);
        assert_eq!(config.output, defaults.output);
        assert_eq!(config.model, defaults.model);
        assert_eq!(config.base_url, defaults.base_url);
        assert_eq!(config.max_tokens, defaults.max_tokens);
        assert_eq!(config.timeout, defaults.timeout);
        assert!(credentials.describe().contains("CHATGPT_KEY"));
    }

    #[test]
    fn test_generate_flags_override() {
        let Command::Generate(args) = parse(&[
            "texref",
            "generate",
            "--out",
            "reference.md",
            "--model",
            "gpt-4o",
            "--max-tokens",
            "2000",
            "--timeout",
            "30",
            "--key-env",
            "MY_KEY",
        ]) else {
            panic!("expected generate");
        };
        let (config, credentials) = generate_config(args).unwrap();

        assert_eq!(config.output, OutputTarget::Path("reference.md".into()));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.timeout, std::time::Duration::from_secs(30));
        assert_eq!(credentials.describe(), "environment (MY_KEY)");
    }

    #[test]
    fn test_out_conflicts_with_pattern() {
        let result = Cli::try_parse_from([
            "texref",
            "generate",
            "--out",
            "a.md",
            "--pattern",
            "b_{model}.md",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_flags_default_to_builder() {
        let Command::Scan(args) = parse(&["texref", "scan"]) else {
            panic!("expected scan");
        };
        let config = scan_config(args).unwrap();
        let defaults = ScanConfig::builder().build().unwrap();

        assert_eq!(config.root_dir, defaults.root_dir);
        assert_eq!(config.output_path, defaults.output_path);
        assert_eq!(config.denylist, defaults.denylist);
        assert!(config.respect_gitignore);
    }
}
