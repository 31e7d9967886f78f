//! `load` command handler: append an exported place list to Postgres.

use std::path::Path;

use anyhow::Context;
use poigrid_core::AppConfig;
use poigrid_scraper::{BatchWriter, ImportBatch, InsertOutcome};

/// Reads `path` and converts it into rows for `location`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array.
pub(crate) fn read_export(path: &Path, location: &str, keyword: &str) -> anyhow::Result<ImportBatch> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let batch = poigrid_scraper::import_export(location, keyword, &content, chrono::Utc::now())?;
    Ok(batch)
}

/// Appends every usable record of `path` to the places table.
///
/// # Errors
///
/// Returns an error if the export cannot be read or the database is
/// unreachable. Rejected rows are counted, not propagated.
pub(crate) async fn run_load(
    config: &AppConfig,
    path: &Path,
    location: &str,
    keyword: &str,
) -> anyhow::Result<()> {
    let batch = read_export(path, location, keyword)?;
    tracing::info!(
        file = %path.display(),
        rows = batch.rows.len(),
        skipped = batch.skipped.len(),
        "export parsed"
    );

    let pool_config = poigrid_db::PoolConfig::from_app_config(config);
    let pool = poigrid_db::connect_pool(&config.database_url, pool_config).await?;
    let writer = BatchWriter::new(poigrid_db::PgRowSink::new(pool), config.batch_size);
    let outcome = writer.write(&batch.rows).await;

    print_summary(&batch, &outcome);
    Ok(())
}

fn print_summary(batch: &ImportBatch, outcome: &InsertOutcome) {
    println!("records skipped:   {}", batch.skipped.len());
    println!("rows inserted:     {}", outcome.inserted);
    println!("rows failed:       {}", outcome.failed);
    println!("batches:           {}", outcome.batches);
    for reason in batch.skipped.iter().take(5) {
        println!("  skipped {reason}");
    }
    for sample in &outcome.failed_samples {
        println!("  failure: {sample}");
    }
}
