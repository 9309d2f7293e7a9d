//! Output of extracted marks: a JSON file or a plain-text listing.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::extract::MarkRecord;

/// Writes records to a pretty-printed JSON file.
pub fn export_to_json(records: &[MarkRecord], output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(records).context("Failed to serialize marks to JSON")?;

    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write marks JSON")?;

    Ok(())
}

/// Writes one block per subject in human-readable form.
pub fn write_summary<W: Write>(records: &[MarkRecord], out: &mut W) -> std::io::Result<()> {
    for record in records {
        writeln!(out)?;
        writeln!(out, "Subject: {} ({})", record.name, record.code)?;
        writeln!(out, "Internal: {}", record.internal)?;
        writeln!(out, "External: {}", record.external)?;
        writeln!(out, "Total: {}", record.total)?;
        writeln!(out, "Result: {}", record.result)?;
    }
    Ok(())
}
