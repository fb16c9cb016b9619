//! Row storage shared by both table formats

use crate::error::{ReadError, Result};
use crate::region::MappedRegion;

/// Lifecycle of a table file object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableState {
    #[default]
    Closed,
    HeaderRead,
    DataRead,
}

/// Location of a run of fixed-width rows inside a mapped region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteSpan {
    /// Absolute offset of the first row
    pub offset: usize,
    /// Number of rows
    pub rows: usize,
    /// Bytes per row
    pub stride: usize,
}
impl ByteSpan {
    #[must_use]
    pub fn new(offset: usize, rows: usize, stride: usize) -> Self {
        Self {
            offset,
            rows,
            stride,
        }
    }

    /// Total bytes covered by the span
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.saturating_mul(self.stride)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Offset one past the last row
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.len())
    }

    /// Absolute offset of row `index`
    #[must_use]
    pub fn row_offset(&self, index: usize) -> usize {
        self.offset + index * self.stride
    }

    /// Bytes of row `index` within `region`
    pub fn row<'a>(&self, region: &'a MappedRegion, index: usize) -> Result<&'a [u8]> {
        if index >= self.rows {
            return Err(ReadError::OutOfRange {
                requested_index: index,
                max_index: self.rows,
            }
            .into());
        }
        let start = self.row_offset(index);
        region.check_span(start, self.stride)?;
        Ok(&region[start..start + self.stride])
    }
}

/// Storage strategy for the rows of one sequence
#[derive(Debug, Clone, PartialEq)]
pub enum RowStore<T> {
    /// Rows decoded into owned memory
    Owned(Vec<T>),
    /// Rows left in the file bytes, decoded on access
    Mapped(ByteSpan),
}
impl<T> Default for RowStore<T> {
    fn default() -> Self {
        Self::Owned(Vec::new())
    }
}
impl<T> RowStore<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Owned(rows) => rows.len(),
            Self::Mapped(span) => span.rows,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }

    #[must_use]
    pub fn span(&self) -> Option<&ByteSpan> {
        match self {
            Self::Mapped(span) => Some(span),
            Self::Owned(_) => None,
        }
    }

    #[must_use]
    pub fn owned(&self) -> Option<&[T]> {
        match self {
            Self::Owned(rows) => Some(rows),
            Self::Mapped(_) => None,
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_span_geometry() {
        let span = ByteSpan::new(16, 3, 25);
        assert_eq!(span.len(), 75);
        assert_eq!(span.end(), 91);
        assert_eq!(span.row_offset(2), 66);
        assert_eq!(span.row_offset(1) - span.row_offset(0), 25);
    }

    #[test]
    fn test_span_row_bounds() {
        let region = MappedRegion::from_bytes((0..20).collect());
        let span = ByteSpan::new(4, 2, 8);
        assert_eq!(span.row(&region, 1).unwrap(), &[12, 13, 14, 15, 16, 17, 18, 19]);
        assert!(span.row(&region, 2).is_err());

        let overhanging = ByteSpan::new(8, 2, 8);
        assert!(overhanging.row(&region, 1).unwrap_err().is_truncation());
    }

    #[test]
    fn test_store_len() {
        let owned: RowStore<u32> = RowStore::Owned(vec![1, 2, 3]);
        assert_eq!(owned.len(), 3);
        assert!(!owned.is_mapped());

        let mapped: RowStore<u32> = RowStore::Mapped(ByteSpan::new(0, 5, 4));
        assert_eq!(mapped.len(), 5);
        assert!(mapped.is_mapped());
        assert!(mapped.owned().is_none());
        assert!(RowStore::<u32>::default().is_empty());
    }
}
