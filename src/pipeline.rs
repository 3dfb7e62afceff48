use crate::{
    config::ScanConfig,
    document::Document,
    error::Result,
    latex::extract_macros,
    macros::MacroSet,
    scanner::Scanner,
    writer::Writer,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace, warn};

/// Statistics collected during a macro scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Markdown documents read
    pub markdown_files: usize,

    /// Notebook documents read
    pub notebook_files: usize,

    /// Files ignored by type or filter
    pub skipped_files: usize,

    /// Files that could not be read
    pub errors: usize,

    /// Macro occurrences found, repeats included
    pub occurrences: usize,

    /// Distinct tokens before cleaning
    pub raw_macros: usize,

    /// Distinct tokens after cleaning
    pub unique_macros: usize,

    /// Macro list file
    pub output_path: String,

    /// Whether the list was written
    pub written: bool,

    /// Total execution time
    pub duration: Duration,
}

impl ScanReport {
    /// Tokens removed by the cleaning pass.
    #[must_use]
    pub const fn cleaned(&self) -> usize {
        self.raw_macros.saturating_sub(self.unique_macros)
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║                Macro Scan Summary                     ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Documents:            {:>8}                        ║",
            self.markdown_files + self.notebook_files
        );
        println!(
            "║   - Markdown:         {:>8}                        ║",
            self.markdown_files
        );
        println!(
            "║   - Notebooks:        {:>8}                        ║",
            self.notebook_files
        );
        println!(
            "║ Skipped / errors:     {:>4} / {:<4}                     ║",
            self.skipped_files, self.errors
        );
        println!("║                                                       ║");
        println!(
            "║ Macro occurrences:    {:>8}                        ║",
            self.occurrences
        );
        println!(
            "║ Unique macros:        {:>8}                        ║",
            self.unique_macros
        );
        println!(
            "║ Removed by cleaning:  {:>8}                        ║",
            self.cleaned()
        );
        println!("║                                                       ║");
        println!("║ Output:                                               ║");
        println!("║   {}", self.output_path);
        println!(
            "║ Total:                {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Runs the macro scan: walk, extract, clean, write.
pub struct ScanPipeline {
    config: ScanConfig,
    scanner: Scanner,
    writer: Writer,
}

impl ScanPipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - A filter glob is invalid
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config)?;
        let writer = Writer::new(config.backup_existing);

        Ok(Self {
            config,
            scanner,
            writer,
        })
    }

    /// Executes the scan and returns statistics.
    ///
    /// The macro list is written one token per line, sorted, replacing the
    /// previous file. Unreadable documents are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured content directory is missing or the
    /// output file cannot be written.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use texref::{ScanConfig, ScanPipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = ScanConfig::builder()
    ///     .root_dir("./book")
    ///     .build()?;
    ///
    /// let report = ScanPipeline::new(config)?.run()?;
    /// report.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(root_dir = %self.config.root_dir.display()))]
    pub fn run(self) -> Result<ScanReport> {
        let start_time = Instant::now();

        info!("Stage 1/3: Scanning documents...");
        let (documents, stats) = self.scanner.scan()?;
        info!(
            "✓ Read {} documents ({} markdown, {} notebooks)",
            stats.documents(),
            stats.markdown_files,
            stats.notebook_files
        );

        if documents.is_empty() {
            warn!(
                "No .md or .ipynb files found under {}",
                self.config.root_dir.display()
            );
        }

        info!("Stage 2/3: Extracting macros...");
        let (mut macros, occurrences) = collect_macros(&documents);
        let raw_macros = macros.len();
        let removed = macros.clean(&self.config.denylist);
        info!(
            "✓ Found {} unique macros ({} occurrences, {} removed by cleaning)",
            macros.len(),
            occurrences,
            removed
        );

        let written = if self.config.dry_run {
            warn!("Dry run mode enabled - skipping file writes");
            for token in &macros {
                info!("  {}", token);
            }
            false
        } else {
            info!("Stage 3/3: Writing macro list...");
            self.writer
                .write(&self.config.output_path, &macros.to_list_string())?;
            info!("✓ Wrote {}", self.config.output_path.display());
            true
        };

        Ok(ScanReport {
            markdown_files: stats.markdown_files,
            notebook_files: stats.notebook_files,
            skipped_files: stats.skipped_files,
            errors: stats.errors,
            occurrences,
            raw_macros,
            unique_macros: macros.len(),
            output_path: self.config.output_path.display().to_string(),
            written,
            duration: start_time.elapsed(),
        })
    }
}

/// Collects the distinct tokens of all documents and the total occurrence count.
///
/// Each segment is walked on its own so code fences never span notebook cells.
fn collect_macros(documents: &[Document]) -> (MacroSet, usize) {
    let mut macros = MacroSet::new();
    let mut occurrences = 0;

    for document in documents {
        let tokens: Vec<&str> = document
            .segments
            .iter()
            .flat_map(|segment| extract_macros(segment))
            .collect();
        debug!("{}: {} macro occurrences", document.relative_path, tokens.len());
        for token in &tokens {
            trace!("{} -> {}", document.relative_path, token);
        }
        occurrences += tokens.len();
        macros.extend(tokens);
    }

    (macros, occurrences)
}
