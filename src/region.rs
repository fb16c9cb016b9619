//! Read-only byte region backing the mapped accessors

use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::config::{MapFallback, ReadOptions, RegionBackend};
use crate::error::{ReadError, Result};

#[derive(Debug, Clone)]
enum Backing {
    Mapped(Arc<Mmap>),
    Buffered(Arc<Vec<u8>>),
}

/// The complete bytes of a table file, either mapped or read into memory
#[derive(Debug, Clone)]
pub struct MappedRegion {
    backing: Backing,
}
impl MappedRegion {
    /// Opens the region at `path` following the backend and fallback in `opts`
    pub fn open<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        match opts.region_backend() {
            RegionBackend::InMemory => Self::read_into_memory(path),
            RegionBackend::Mmap => match Self::map(path) {
                Ok(region) => Ok(region),
                Err(e) if opts.map_fallback() == MapFallback::ReadIntoMemory => {
                    warn!(?path, error = %e, "mapping failed, reading file into memory");
                    Self::read_into_memory(path)
                }
                Err(e) => Err(e),
            },
        }
    }

    fn map(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ReadError::UnableToOpen(path.to_path_buf(), e))?;

        // Safety: the file is opened read-only and is not modified while mapped
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| ReadError::MappingFailure(path.to_path_buf(), e))?;
        debug!(?path, len = mmap.len(), "mapped file");
        Ok(Self {
            backing: Backing::Mapped(Arc::new(mmap)),
        })
    }

    fn read_into_memory(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).map_err(|e| ReadError::UnableToOpen(path.to_path_buf(), e))?;
        debug!(?path, len = bytes.len(), "buffered file");
        Ok(Self::from_bytes(bytes))
    }

    /// Wraps an in-memory buffer as a region
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Buffered(Arc::new(bytes)),
        }
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mapped(_))
    }

    /// Checks that `len` bytes starting at `offset` lie inside the region
    pub fn check_span(&self, offset: usize, len: usize) -> Result<()> {
        let end = offset.saturating_add(len);
        if end > self.len() {
            return Err(ReadError::FileTruncation {
                end,
                len: self.len(),
            }
            .into());
        }
        Ok(())
    }
}

impl Deref for MappedRegion {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(mmap) => &mmap[..],
            Backing::Buffered(bytes) => &bytes[..],
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_backends_agree() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"barr\r\n\x1a\n0123")?;
        file.flush()?;

        let mapped = MappedRegion::open(file.path(), &ReadOptions::mapped())?;
        let buffered = MappedRegion::open(
            file.path(),
            &ReadOptions::mapped().backend(RegionBackend::InMemory),
        )?;
        assert!(mapped.is_mapped());
        assert!(!buffered.is_mapped());
        assert_eq!(&mapped[..], &buffered[..]);
        assert_eq!(mapped.len(), 12);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MappedRegion::open(dir.path().join("absent.bar"), &ReadOptions::mapped())
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ReadError(ReadError::UnableToOpen(..))
        ));
    }

    #[test]
    fn test_check_span() {
        let region = MappedRegion::from_bytes(vec![0; 10]);
        assert!(region.check_span(6, 4).is_ok());
        assert!(region.check_span(7, 4).unwrap_err().is_truncation());
        assert!(region.check_span(usize::MAX, 4).is_err());
    }
}
