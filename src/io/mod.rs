//! CSV ingestion and export.

pub mod empirical;
pub mod export;
