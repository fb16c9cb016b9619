//! Options governing how a table file is opened

/// How the data section is accessed after the metadata pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Decode every row into owned memory during `read`
    #[default]
    Copy,
    /// Keep the file bytes resident and decode rows on demand
    Mapped,
}

/// Where the bytes of a mapped table come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionBackend {
    /// Platform memory mapping
    #[default]
    Mmap,
    /// The whole file read into a heap buffer
    InMemory,
}

/// What to do when the platform refuses to map the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapFallback {
    /// Fail the read with a mapping error
    #[default]
    Fail,
    /// Read the whole file into memory instead
    ReadIntoMemory,
}

/// Read configuration shared by the BPMAP and BAR readers
///
/// # Example
///
/// ```
/// use tilebin::{AccessMode, MapFallback, ReadOptions};
///
/// let opts = ReadOptions::default()
///     .access(AccessMode::Mapped)
///     .fallback(MapFallback::ReadIntoMemory);
/// assert_eq!(opts.access_mode(), AccessMode::Mapped);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOptions {
    access: AccessMode,
    backend: RegionBackend,
    fallback: MapFallback,
}
impl ReadOptions {
    /// Copy-mode options
    #[must_use]
    pub fn copy() -> Self {
        Self::default()
    }

    /// Mapped-mode options with the default backend
    #[must_use]
    pub fn mapped() -> Self {
        Self::default().access(AccessMode::Mapped)
    }

    #[must_use]
    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }
    #[must_use]
    pub fn backend(mut self, backend: RegionBackend) -> Self {
        self.backend = backend;
        self
    }
    #[must_use]
    pub fn fallback(mut self, fallback: MapFallback) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.access
    }
    #[must_use]
    pub fn region_backend(&self) -> RegionBackend {
        self.backend
    }
    #[must_use]
    pub fn map_fallback(&self) -> MapFallback {
        self.fallback
    }
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.access == AccessMode::Mapped
    }
}
