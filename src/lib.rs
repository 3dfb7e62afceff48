//! # texref
//!
//! Builds a LaTeX reference sheet for a Jupyter Book.
//!
//! ## Features
//!
//! - Collects every macro used in the book's `.md` and `.ipynb` files
//! - Skips code blocks and code cells, scans MyST math blocks
//! - Writes a deduplicated, sorted macro list
//! - Asks an OpenAI-compatible model to turn the list into a categorized
//!   markdown reference
//!
//! ## Quick Start
//!
//! ```no_run
//! use texref::{EnvCredentials, GenerateConfig, ReferenceGenerator, ScanConfig, ScanPipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let scan = ScanConfig::builder()
//!     .root_dir("./book")
//!     .output_path("macros_used.txt")
//!     .build()?;
//! ScanPipeline::new(scan)?.run()?;
//!
//! let generate = GenerateConfig::builder()
//!     .macros_path("macros_used.txt")
//!     .subject("a Bayesian statistics class")
//!     .build()?;
//! ReferenceGenerator::new(generate, &EnvCredentials::default())?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Two independent steps that share only the macro list file:
//! 1. **Scan**: walk the book, extract macro tokens, clean, write the list
//! 2. **Generate**: read the list, render the prompt, call the model, write
//!    the reply

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod credentials;
mod document;
mod error;
mod filter;
mod generator;
mod latex;
mod macros;
mod pipeline;
mod prompt;
mod scanner;
mod writer;

pub use client::{CompletionClient, OpenAiClient};
pub use config::{
    ApiKind, GenerateConfig, GenerateConfigBuilder, OutputTarget, ScanConfig, ScanConfigBuilder,
};
pub use credentials::{
    ApiKey, CredentialSource, DEFAULT_KEY_VARS, EnvCredentials, FnCredentials, StaticCredentials,
};
pub use document::{Document, DocumentKind};
pub use error::{Error, Result};
pub use filter::FileFilterConfig;
pub use generator::{GenerateReport, ReferenceGenerator};
pub use latex::extract_macros;
pub use macros::{DEFAULT_DENYLIST, MacroSet};
pub use pipeline::{ScanPipeline, ScanReport};
pub use prompt::{Prompt, PromptBuilder};
pub use scanner::ScanStats;

/// Runs the macro scan with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Root directory doesn't exist or is not a directory
/// - A configured content directory is missing
/// - The macro list cannot be written
///
/// # Examples
///
/// ```no_run
/// use texref::{ScanConfig, scan};
///
/// # fn main() -> anyhow::Result<()> {
/// let report = scan(ScanConfig::builder().root_dir(".").build()?)?;
/// println!("{} macros", report.unique_macros);
/// # Ok(())
/// # }
/// ```
pub fn scan(config: ScanConfig) -> Result<ScanReport> {
    ScanPipeline::new(config)?.run()
}

/// Generates the reference document with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - No valid API key is available
/// - The macro list is missing or empty
/// - The remote call fails
/// - The document cannot be written
pub fn generate(
    config: GenerateConfig,
    credentials: &dyn CredentialSource,
) -> Result<GenerateReport> {
    ReferenceGenerator::new(config, credentials)?.run()
}
