//! Per-request staging of fetched bytes.
//!
//! A fetched body lives either in memory or in a uniquely named temporary
//! file. Staged files belong to the [`FetchedImage`] that owns them and are
//! removed when it drops, whichever stage of the pipeline it reaches.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::constants::STAGING_PREFIX;
use super::error::FetchError;

/// Where fetched bytes are kept between the fetch and decode stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StagingStrategy {
    /// Buffer the body in memory.
    #[default]
    Memory,
    /// Stream the body into a unique temporary file inside `dir`.
    Disk {
        /// Directory that receives the staging files.
        dir: PathBuf,
    },
}

impl StagingStrategy {
    /// Disk staging in the given directory.
    pub fn disk(dir: impl Into<PathBuf>) -> Self {
        Self::Disk { dir: dir.into() }
    }

    /// Disk staging in the OS temporary directory.
    #[must_use]
    pub fn os_temp_dir() -> Self {
        Self::disk(std::env::temp_dir())
    }
}

#[derive(Debug)]
pub(crate) enum Payload {
    Memory(Vec<u8>),
    Staged(NamedTempFile),
}

/// A fully received, non-empty image body.
#[derive(Debug)]
pub struct FetchedImage {
    payload: Payload,
    content_type: Option<String>,
    len: u64,
}

impl FetchedImage {
    /// Wraps an in-memory body. Returns `None` for an empty buffer.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>, content_type: Option<String>) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let len = bytes.len() as u64;
        Some(Self {
            payload: Payload::Memory(bytes),
            content_type,
            len,
        })
    }

    /// Number of body bytes received. Never zero.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Always false; zero-length fetches never become a `FetchedImage`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The upstream `Content-Type`, if one was sent.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Path of the staging file when disk staging is in use.
    #[must_use]
    pub fn staged_path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Memory(_) => None,
            Payload::Staged(file) => Some(file.path()),
        }
    }

    pub(crate) fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// Write side of a staging area, alive while the body streams in.
pub(crate) enum StagingSink {
    Memory(Vec<u8>),
    Disk {
        writer: BufWriter<File>,
        file: NamedTempFile,
    },
}

impl StagingSink {
    pub(crate) fn open(
        strategy: &StagingStrategy,
        capacity_hint: Option<u64>,
    ) -> Result<Self, FetchError> {
        match strategy {
            StagingStrategy::Memory => {
                let capacity = capacity_hint
                    .and_then(|hint| usize::try_from(hint).ok())
                    .unwrap_or_default();
                Ok(Self::Memory(Vec::with_capacity(capacity)))
            }
            StagingStrategy::Disk { dir } => {
                let file = tempfile::Builder::new()
                    .prefix(STAGING_PREFIX)
                    .suffix(".img")
                    .tempfile_in(dir)
                    .map_err(|e| FetchError::staging(dir.clone(), e))?;
                let handle = file
                    .as_file()
                    .try_clone()
                    .map_err(|e| FetchError::staging(file.path(), e))?;
                debug!(path = %file.path().display(), "staging image to disk");
                Ok(Self::Disk {
                    writer: BufWriter::new(File::from_std(handle)),
                    file,
                })
            }
        }
    }

    pub(crate) async fn write(&mut self, chunk: &[u8]) -> Result<(), FetchError> {
        match self {
            Self::Memory(buffer) => {
                buffer.extend_from_slice(chunk);
                Ok(())
            }
            Self::Disk { writer, file } => writer
                .write_all(chunk)
                .await
                .map_err(|e| FetchError::staging(file.path(), e)),
        }
    }

    /// Flushes the sink and hands ownership of the bytes to a [`FetchedImage`].
    pub(crate) async fn finish(
        self,
        len: u64,
        content_type: Option<String>,
    ) -> Result<FetchedImage, FetchError> {
        let payload = match self {
            Self::Memory(buffer) => Payload::Memory(buffer),
            Self::Disk { mut writer, file } => {
                writer
                    .flush()
                    .await
                    .map_err(|e| FetchError::staging(file.path(), e))?;
                Payload::Staged(file)
            }
        };
        Ok(FetchedImage {
            payload,
            content_type,
            len,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_bytes_rejects_empty_buffer() {
        assert!(FetchedImage::from_bytes(Vec::new(), None).is_none());
    }

    #[test]
    fn test_from_bytes_keeps_content_type() {
        let image = FetchedImage::from_bytes(vec![1, 2, 3], Some("image/png".into())).unwrap();
        assert_eq!(image.len(), 3);
        assert!(!image.is_empty());
        assert_eq!(image.content_type(), Some("image/png"));
        assert!(image.staged_path().is_none());
    }

    #[tokio::test]
    async fn test_disk_sink_removes_file_on_drop() {
        let dir = TempDir::new().unwrap();
        let strategy = StagingStrategy::disk(dir.path());

        let mut sink = StagingSink::open(&strategy, None).unwrap();
        sink.write(b"image bytes").await.unwrap();
        let image = sink.finish(11, None).await.unwrap();

        let path = image.staged_path().unwrap().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"image bytes");

        drop(image);
        assert!(!path.exists(), "staged file should be removed on drop");
    }

    #[tokio::test]
    async fn test_disk_sink_abandoned_mid_stream_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let strategy = StagingStrategy::disk(dir.path());

        let mut sink = StagingSink::open(&strategy, None).unwrap();
        sink.write(b"partial").await.unwrap();
        drop(sink);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_disk_sinks_use_distinct_paths() {
        let dir = TempDir::new().unwrap();
        let strategy = StagingStrategy::disk(dir.path());

        let first = StagingSink::open(&strategy, None).unwrap();
        let second = StagingSink::open(&strategy, None).unwrap();
        let (StagingSink::Disk { file: a, .. }, StagingSink::Disk { file: b, .. }) =
            (&first, &second)
        else {
            panic!("expected disk sinks");
        };
        assert_ne!(a.path(), b.path());
        assert!(
            a.path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(STAGING_PREFIX)
        );
    }

    #[test]
    fn test_open_in_missing_dir_is_staging_error() {
        let strategy = StagingStrategy::disk("/nonexistent/qrdecode/staging");
        let result = StagingSink::open(&strategy, None);
        assert!(matches!(result, Err(FetchError::Staging { .. })));
    }
}
