//! Basic example of using texref as a library
//!
//! Scans a book for LaTeX macros and writes the macro list.

use texref::{ScanConfig, ScanPipeline};

fn main() -> anyhow::Result<()> {
    let root = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());

    let config = ScanConfig::builder()
        .root_dir(&root)
        .output_path("macros_used.txt")
        .build()?;

    // Run the scan
    let report = ScanPipeline::new(config)?.run()?;

    report.print_summary();

    println!(
        "\n✓ Found {} macros in {} documents",
        report.unique_macros,
        report.markdown_files + report.notebook_files
    );

    Ok(())
}
