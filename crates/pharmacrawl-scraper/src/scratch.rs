//! Scratch storage for raw documents while their target is in flight.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

#[async_trait]
pub trait ScratchStore: Send + Sync {
    async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()>;

    async fn read(&self, key: &str) -> io::Result<Vec<u8>>;

    async fn delete(&self, key: &str) -> io::Result<()>;
}

/// One `{key}.html` file per document under a root directory.
#[derive(Debug, Clone)]
pub struct FsScratchStore {
    root: PathBuf,
}

impl FsScratchStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.html"))
    }
}

#[async_trait]
impl ScratchStore for FsScratchStore {
    async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(key), bytes).await
    }

    async fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.path_for(key)).await
    }

    async fn delete(&self, key: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Removes every file left under `root` by an earlier process and recreates
/// the directory. Returns the number of entries removed.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be listed or
/// recreated.
pub async fn wipe_scratch_dir(root: &Path) -> io::Result<usize> {
    let mut removed = 0usize;
    match tokio::fs::read_dir(root).await {
        Ok(mut entries) => {
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let result = if entry.file_type().await?.is_dir() {
                    tokio::fs::remove_dir_all(&path).await
                } else {
                    tokio::fs::remove_file(&path).await
                };
                match result {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "could not remove scratch entry");
                    }
                }
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::create_dir_all(root).await?;
    Ok(removed)
}
