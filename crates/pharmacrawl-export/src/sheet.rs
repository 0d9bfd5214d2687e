use pharmacrawl_core::{Record, SiteVariant};

use crate::ExportError;

/// One spreadsheet view over the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sheet {
    #[default]
    All,
    Medications,
    Care,
    Legacy,
}

impl Sheet {
    pub const ALL: [Sheet; 4] = [Sheet::All, Sheet::Medications, Sheet::Care, Sheet::Legacy];

    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Sheet::All => "products.csv",
            Sheet::Medications => "products_medications.csv",
            Sheet::Care => "products_care.csv",
            Sheet::Legacy => "products_legacy.csv",
        }
    }

    /// Worksheet name inside the workbook.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Sheet::All => "All Products",
            Sheet::Medications => "Medications",
            Sheet::Care => "Care Products",
            Sheet::Legacy => "Old Site Products",
        }
    }

    #[must_use]
    pub fn includes(self, record: &Record) -> bool {
        match self {
            Sheet::All => true,
            Sheet::Medications => record.is_medication(),
            Sheet::Care => record.is_care_product(),
            Sheet::Legacy => record.source == SiteVariant::Legacy,
        }
    }
}

impl std::str::FromStr for Sheet {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" | "products" => Ok(Sheet::All),
            "medications" | "medication" => Ok(Sheet::Medications),
            "care" | "care-products" => Ok(Sheet::Care),
            "legacy" => Ok(Sheet::Legacy),
            other => Err(ExportError::UnknownSheet(other.to_string())),
        }
    }
}
