use crate::core::PdfTextReader;
use crate::core::extract;
use crate::core::model::ExtractedFields;
use anyhow::{Context, Result};
use std::path::Path;

/// Runs the bill extractor on a local PDF and prints what it found.
pub fn run(reader: &dyn PdfTextReader, path: &Path) -> Result<()> {
    let fields = extract_file(reader, path)?;
    println!("{}", describe(&fields));
    Ok(())
}

fn extract_file(reader: &dyn PdfTextReader, path: &Path) -> Result<ExtractedFields> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = reader
        .read_text(&bytes)
        .with_context(|| format!("Failed to extract text from {}", path.display()))?;
    Ok(extract::extract(&text))
}

fn describe(fields: &ExtractedFields) -> String {
    if fields.ignore {
        return "Not a transfer invoice".to_string();
    }
    let date = fields
        .date
        .map_or("N/A".to_string(), |d| d.format("%Y-%m-%d").to_string());
    let amount = fields.amount.map_or("N/A".to_string(), |a| format!("{a:.2} EUR"));
    format!("Transfer invoice\n  date:   {date}\n  amount: {amount}")
}
