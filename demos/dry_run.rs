//! Dry run example
//!
//! Scans a book, then renders the reference prompt without calling the API.
//! No API key is needed.

use texref::{EnvCredentials, GenerateConfig, ReferenceGenerator, ScanConfig};

fn main() -> anyhow::Result<()> {
    let root = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());

    let scan = ScanConfig::builder()
        .root_dir(&root)
        .output_path("macros_used.txt")
        .build()?;
    let scanned = texref::scan(scan)?;

    println!("Collected {} macros\n", scanned.unique_macros);

    let config = GenerateConfig::builder()
        .macros_path("macros_used.txt")
        .subject("a Bayesian statistics class")
        .dry_run(true) // Print the prompt, skip the request
        .build()?;

    // Dry runs never load the key
    let report = ReferenceGenerator::new(config, &EnvCredentials::default())?.run()?;

    println!("\nWould have sent:");
    println!("  {} macros", report.macros);
    println!("  {} prompt bytes", report.prompt_bytes);
    println!("  Output: {}", report.output_path);

    Ok(())
}
