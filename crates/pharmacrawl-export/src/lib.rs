//! Persisted artifacts of the latest crawl run.
//!
//! Layout under the data directory:
//!
//! | File | Content |
//! |------|---------|
//! | `products.json` | every record, pretty JSON |
//! | `products.xlsx` | workbook with one worksheet per populated view |
//! | `products.csv` | every record |
//! | `products_medications.csv` | medication categories only |
//! | `products_care.csv` | care-product categories only |
//! | `products_legacy.csv` | legacy-site lookups only |
//! | `targets.json` | the resolved work list of the run |
//!
//! Filtered sheets exist only when they have rows. Every file is written to
//! a `.tmp` sibling and renamed into place, so readers never see a partial
//! artifact.

mod sheet;
mod store;
mod workbook;

pub use sheet::Sheet;
pub use store::{ExportStore, ExportSummary};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("unknown sheet '{0}' (expected all, medications, care or legacy)")]
    UnknownSheet(String),
}
