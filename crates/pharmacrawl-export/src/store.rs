use std::path::{Path, PathBuf};

use pharmacrawl_core::Record;
use serde::Serialize;

use crate::sheet::Sheet;
use crate::{workbook, ExportError};

const JSON_FILE: &str = "products.json";
const WORKBOOK_FILE: &str = "products.xlsx";
const TARGETS_FILE: &str = "targets.json";

/// Column headers, in `Record` field order.
pub(crate) const COLUMNS: [&str; 7] = [
    "productCode",
    "title",
    "price",
    "priceOld",
    "category",
    "pageNumber",
    "source",
];

/// Row counts written per sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total: usize,
    pub medications: usize,
    pub care: usize,
    pub legacy: usize,
}

#[derive(Debug, Clone)]
pub struct ExportStore {
    dir: PathBuf,
}

impl ExportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn json_path(&self) -> PathBuf {
        self.dir.join(JSON_FILE)
    }

    #[must_use]
    pub fn workbook_path(&self) -> PathBuf {
        self.dir.join(WORKBOOK_FILE)
    }

    #[must_use]
    pub fn sheet_path(&self, sheet: Sheet) -> PathBuf {
        self.dir.join(sheet.file_name())
    }

    #[must_use]
    pub fn targets_path(&self) -> PathBuf {
        self.dir.join(TARGETS_FILE)
    }

    /// Writes the JSON artifact, the workbook and every CSV view of `records`.
    ///
    /// The all-records sheet is always written; filtered sheets are written
    /// when they have rows and removed otherwise so no stale view survives.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if serialization or a file write fails.
    pub async fn write_records(&self, records: &[Record]) -> Result<ExportSummary, ExportError> {
        self.ensure_dir().await?;

        let json = serde_json::to_vec_pretty(records)?;
        write_file(&self.json_path(), &json).await?;
        write_file(&self.workbook_path(), &workbook::render(records)?).await?;

        let mut summary = ExportSummary::default();
        for sheet in Sheet::ALL {
            let rows: Vec<&Record> = records.iter().filter(|r| sheet.includes(r)).collect();
            let path = self.sheet_path(sheet);
            if rows.is_empty() && sheet != Sheet::All {
                remove_if_present(&path).await?;
                continue;
            }
            write_file(&path, &to_csv(&rows)?).await?;
            match sheet {
                Sheet::All => summary.total = rows.len(),
                Sheet::Medications => summary.medications = rows.len(),
                Sheet::Care => summary.care = rows.len(),
                Sheet::Legacy => summary.legacy = rows.len(),
            }
        }

        tracing::info!(
            dir = %self.dir.display(),
            total = summary.total,
            medications = summary.medications,
            care = summary.care,
            legacy = summary.legacy,
            "exported crawl artifacts"
        );
        Ok(summary)
    }

    /// Persists the resolved work list of a run.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if serialization or the write fails.
    pub async fn write_targets<T: Serialize + Sync>(&self, targets: &[T]) -> Result<(), ExportError> {
        self.ensure_dir().await?;
        let json = serde_json::to_vec_pretty(targets)?;
        write_file(&self.targets_path(), &json).await
    }

    /// Records of the last persisted run, or `None` if nothing was persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if the file exists but cannot be read or parsed.
    pub async fn load_records(&self) -> Result<Option<Vec<Record>>, ExportError> {
        match self.read_json().await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Raw bytes of `products.json`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] on any read error other than not-found.
    pub async fn read_json(&self) -> Result<Option<Vec<u8>>, ExportError> {
        read_optional(&self.json_path()).await
    }

    /// Raw bytes of `products.xlsx`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] on any read error other than not-found.
    pub async fn read_workbook(&self) -> Result<Option<Vec<u8>>, ExportError> {
        read_optional(&self.workbook_path()).await
    }

    /// Raw bytes of a CSV view, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] on any read error other than not-found.
    pub async fn read_sheet(&self, sheet: Sheet) -> Result<Option<Vec<u8>>, ExportError> {
        read_optional(&self.sheet_path(sheet)).await
    }

    async fn ensure_dir(&self) -> Result<(), ExportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ExportError::Io {
                path: self.dir.clone(),
                source,
            })
    }
}

fn to_csv(rows: &[&Record]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

/// Replaces `path` by writing a `.tmp` sibling and renaming it over the
/// target, so a concurrent reader sees either the old or the new file.
async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let tmp = tmp_path(path);
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Err(source) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(source));
    }
    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(source));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ExportError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ExportError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn remove_if_present(path: &Path) -> Result<(), ExportError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ExportError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use pharmacrawl_core::SiteVariant;

    use super::*;

    fn record(code: &str, category: &str, source: SiteVariant) -> Record {
        Record {
            product_code: code.to_string(),
            title: format!("Product {code}"),
            price: "5.50".to_string(),
            price_old: String::new(),
            category: category.to_string(),
            page_number: "1".to_string(),
            source,
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record("A100", "https://shop.aversi.ge/ka/medication/-/", SiteVariant::Current),
            record("B200", "https://shop.aversi.ge/ka/care-products/oral-care/", SiteVariant::Current),
            record("999", "", SiteVariant::Legacy),
        ]
    }

    #[tokio::test]
    async fn writes_json_and_every_populated_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path().join("data"));

        let summary = store.write_records(&sample()).await.unwrap();
        assert_eq!(
            summary,
            ExportSummary {
                total: 3,
                medications: 1,
                care: 1,
                legacy: 1,
            }
        );

        let loaded = store.load_records().await.unwrap().unwrap();
        assert_eq!(loaded, sample());

        let csv = String::from_utf8(store.read_sheet(Sheet::All).await.unwrap().unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("productCode,title,price,priceOld,category,pageNumber,source")
        );
        assert_eq!(
            lines.next(),
            Some("A100,Product A100,5.50,,https://shop.aversi.ge/ka/medication/-/,1,current")
        );
        assert_eq!(csv.lines().count(), 4);

        let legacy =
            String::from_utf8(store.read_sheet(Sheet::Legacy).await.unwrap().unwrap()).unwrap();
        assert!(legacy.contains("999,Product 999"));
        assert!(!legacy.contains("A100"));
    }

    #[tokio::test]
    async fn empty_filtered_sheets_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path());
        store.write_records(&sample()).await.unwrap();
        assert!(store.sheet_path(Sheet::Care).exists());

        let only_legacy = vec![record("999", "", SiteVariant::Legacy)];
        let summary = store.write_records(&only_legacy).await.unwrap();
        assert_eq!(summary.care, 0);
        assert!(!store.sheet_path(Sheet::Care).exists());
        assert!(!store.sheet_path(Sheet::Medications).exists());
        assert!(store.sheet_path(Sheet::Legacy).exists());
    }

    #[tokio::test]
    async fn all_sheet_keeps_header_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path());
        store.write_records(&[]).await.unwrap();
        let csv = String::from_utf8(store.read_sheet(Sheet::All).await.unwrap().unwrap()).unwrap();
        assert_eq!(csv.trim_end(), COLUMNS.join(","));
    }

    #[tokio::test]
    async fn missing_artifacts_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path().join("nothing-yet"));
        assert!(store.load_records().await.unwrap().is_none());
        assert!(store.read_sheet(Sheet::All).await.unwrap().is_none());
        assert!(store.read_workbook().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn workbook_has_a_worksheet_per_populated_view() {
        use std::io::Read;

        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path());
        store.write_records(&sample()).await.unwrap();

        let bytes = store.read_workbook().await.unwrap().unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut book = String::new();
        archive
            .by_name("xl/workbook.xml")
            .unwrap()
            .read_to_string(&mut book)
            .unwrap();
        for title in ["All Products", "Medications", "Care Products", "Old Site Products"] {
            assert!(book.contains(&format!("name=\"{title}\"")), "{title} missing");
        }

        let mut strings = String::new();
        archive
            .by_name("xl/sharedStrings.xml")
            .unwrap()
            .read_to_string(&mut strings)
            .unwrap();
        for column in COLUMNS {
            assert!(strings.contains(column), "{column} header missing");
        }
        assert!(strings.contains("Product A100"));

        let only_legacy = vec![record("999", "", SiteVariant::Legacy)];
        store.write_records(&only_legacy).await.unwrap();
        let bytes = store.read_workbook().await.unwrap().unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut book = String::new();
        archive
            .by_name("xl/workbook.xml")
            .unwrap()
            .read_to_string(&mut book)
            .unwrap();
        assert!(book.contains("name=\"All Products\""));
        assert!(book.contains("name=\"Old Site Products\""));
        assert!(!book.contains("name=\"Medications\""));
    }

    #[tokio::test]
    async fn rewrites_replace_files_without_leaving_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path());
        store.write_records(&sample()).await.unwrap();
        store
            .write_records(&[record("999", "", SiteVariant::Legacy)])
            .await
            .unwrap();
        store.write_targets(&["a"]).await.unwrap();

        let loaded = store.load_records().await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path());
        store.write_targets(&["a"]).await.unwrap();

        // A directory squatting on the temp name makes the write fail.
        std::fs::create_dir(tmp_path(&store.targets_path())).unwrap();
        assert!(matches!(
            store.write_targets(&["b"]).await,
            Err(ExportError::Io { .. })
        ));

        let raw = std::fs::read_to_string(store.targets_path()).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["a"]);
    }

    #[tokio::test]
    async fn targets_are_persisted_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path());
        store.write_targets(&["a", "b"]).await.unwrap();
        let raw = std::fs::read_to_string(store.targets_path()).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }
}
