use anyhow::{Context, Result};
use std::path::Path;

use sprout_core::service::SproutService;

pub(crate) fn cmd_import_legacy(
    svc: &SproutService,
    file: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let summary = svc.import_legacy(&data, dry_run)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "records_parsed": summary.records_parsed,
                "feedings_imported": summary.feedings_imported,
                "duplicates_skipped": summary.duplicates_skipped,
                "dry_run": dry_run,
            })
        );
        return Ok(());
    }

    if dry_run {
        println!("Dry run: nothing was written");
    }
    println!("Records parsed:     {}", summary.records_parsed);
    println!("Feedings imported:  {}", summary.feedings_imported);
    println!("Duplicates skipped: {}", summary.duplicates_skipped);
    Ok(())
}
