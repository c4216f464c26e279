//! Core business logic abstractions

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod log;
pub mod model;
pub mod pdf;
pub mod store;

// Re-export main types for cleaner imports
pub use api::NaloApi;
pub use error::ConnectorError;
pub use pdf::{PdfExtractReader, PdfTextReader};
pub use store::Store;
