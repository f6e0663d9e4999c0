//! Append-only log file used by the filesystem suites.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::fixture::Fixture;

/// A file that every append reopens in append mode, so each call pays for
/// the open as well as the write. Clones are cheap and `Send`.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: Arc<PathBuf>,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `data` with blocking I/O, creating the file if it is missing.
    pub fn append_sync(&self, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.path.as_path())?;
        file.write_all(data)
    }

    /// Appends `data` through `tokio::fs`.
    pub async fn append_async(&self, data: &[u8]) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.path.as_path())
            .await?;
        file.write_all(data).await?;
        // tokio files finish writes in the background unless flushed.
        file.flush().await
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(self.path.as_path())?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// An empty [`LogFile`], truncated between suites and removed on teardown.
pub struct FileFixture {
    file: LogFile,
}

impl FileFixture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: LogFile::new(path),
        }
    }
}

impl Fixture for FileFixture {
    type Context = LogFile;

    async fn prepare(&mut self) -> Result<()> {
        if let Some(dir) = self.file.path().parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::File::create(self.file.path()).await?;
        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        // File::create truncates an existing file.
        tokio::fs::File::create(self.file.path()).await?;
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        match tokio::fs::remove_file(self.file.path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn context(&self) -> Result<LogFile> {
        Ok(self.file.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sync_and_async_appends_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let log = LogFile::new(dir.path().join("append.log"));
        log.append_sync(b"hello\n").unwrap();
        log.append_async(b"world\n").await.unwrap();
        assert_eq!(log.len().unwrap(), 12);
        assert_eq!(
            std::fs::read_to_string(log.path()).unwrap(),
            "hello\nworld\n"
        );
    }

    #[tokio::test]
    async fn test_fixture_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("append.log");
        let mut fixture = FileFixture::new(&path);

        fixture.prepare().await.unwrap();
        let log = fixture.context().unwrap();
        assert!(log.is_empty().unwrap());
        log.append_sync(&[b'x'; 4096]).unwrap();
        assert_eq!(log.len().unwrap(), 4096);

        fixture.reset().await.unwrap();
        assert!(log.is_empty().unwrap());

        fixture.teardown().await.unwrap();
        assert!(!path.exists());
        fixture.teardown().await.unwrap();
    }
}
