//! Custom configuration example
//!
//! Scans selected unit folders, keeps `\t` in the list, and generates the
//! reference with a key loaded from a file.

use texref::{
    ApiKey, ApiKind, FileFilterConfig, FnCredentials, GenerateConfig, ReferenceGenerator,
    ScanConfig,
};

fn main() -> anyhow::Result<()> {
    let scan = ScanConfig::builder()
        .root_dir("./book")
        .include_dirs(vec!["unit1".into(), "unit2".into(), "backmatter".into()])
        .output_path("out/macros_used.txt")
        .file_filter_config(FileFilterConfig::new().exclude_directories(vec!["**/drafts".into()]))
        .keep(["\\t"])
        .backup_existing(true)
        .build()?;
    texref::scan(scan)?.print_summary();

    let config = GenerateConfig::builder()
        .macros_path("out/macros_used.txt")
        .output_pattern("out/latex_reference_{model}_{timestamp}.md")
        .model("gpt-4o")
        .api_kind(ApiKind::Chat)
        .temperature(0.3)
        .subject("a Bayesian statistics class")
        .build()?;

    let credentials = FnCredentials::new(|| {
        let key = std::fs::read_to_string(".openai_key")
            .map_err(|e| texref::Error::credential(format!(".openai_key: {e}")))?;
        ApiKey::new(key)
    });

    let report = ReferenceGenerator::new(config, &credentials)?.run()?;
    println!("✓ Reference written to {}", report.output_path);

    Ok(())
}
