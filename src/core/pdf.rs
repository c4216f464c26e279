use anyhow::{Result, anyhow};
use std::panic::{self, AssertUnwindSafe};

/// Turns a PDF document into plain text, one text line per `\n`.
pub trait PdfTextReader: Send + Sync {
    fn read_text(&self, bytes: &[u8]) -> Result<String>;
}

/// Reader backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractReader;

impl PdfTextReader for PdfExtractReader {
    fn read_text(&self, bytes: &[u8]) -> Result<String> {
        // pdf-extract panics on some malformed documents
        panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
            .map_err(|_| anyhow!("PDF reader panicked"))?
            .map_err(|e| anyhow!("Failed to read PDF text: {e:?}"))
    }
}
