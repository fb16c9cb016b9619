//! BAR writer
//!
//! The header is written as soon as the writer is built, so the number of sequences
//! must be declared up front. Sequences are then streamed one at a time and
//! [`BarWriter::finish`] appends the footer.

use std::io::Write;

use tracing::debug;

use super::column::{ColumnType, ResultValue};
use super::header::{BarHeader, FOOTER};
use super::sequence::{ResultSequence, ResultSequenceView};
use crate::codec::TableWrite;
use crate::error::{Result, WriteError};
use crate::params::ParameterList;
use crate::store::RowStore;

/// Builder for [`BarWriter`]
///
/// Either a complete [`BarHeader`] or the column types must be provided.
///
/// # Example
///
/// ```
/// # use tilebin::{BarWriterBuilder, ColumnType, ResultSequence, ResultValue, Result};
/// # fn main() -> Result<()> {
/// let mut writer = BarWriterBuilder::default()
///     .columns(vec![ColumnType::Integer, ColumnType::Float])
///     .num_sequences(1)
///     .build(Vec::new())?;
///
/// let mut seq = ResultSequence::new("chr1").group_name("Hs").version("hg19");
/// seq.add_row(vec![ResultValue::Integer(100), ResultValue::Float(0.5)]);
/// writer.write_sequence(&seq)?;
/// let bytes = writer.finish()?;
/// assert!(bytes.ends_with(b"END\n"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct BarWriterBuilder {
    header: Option<BarHeader>,
    version: Option<f32>,
    columns: Option<Vec<ColumnType>>,
    parameters: ParameterList,
    num_sequences: Option<usize>,
}
impl BarWriterBuilder {
    /// Starts from a complete header; later setters override its fields
    #[must_use]
    pub fn header(mut self, header: BarHeader) -> Self {
        self.header = Some(header);
        self
    }

    #[must_use]
    pub fn version(mut self, version: f32) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn columns(mut self, columns: Vec<ColumnType>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Appends a file-level parameter
    #[must_use]
    pub fn parameter(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.append(tag, value);
        self
    }

    #[must_use]
    pub fn num_sequences(mut self, num_sequences: usize) -> Self {
        self.num_sequences = Some(num_sequences);
        self
    }

    /// Writes the header to `inner` and returns the writer
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::MissingHeader`] when neither a header nor the columns
    /// were given, or an I/O error from writing the header.
    pub fn build<W: Write>(self, inner: W) -> Result<BarWriter<W>> {
        let mut header = match (self.header, self.columns) {
            (Some(mut header), Some(columns)) => {
                header.columns = columns;
                header
            }
            (Some(header), None) => header,
            (None, Some(columns)) => BarHeader::new(columns),
            (None, None) => return Err(WriteError::MissingHeader.into()),
        };
        if let Some(version) = self.version {
            header.version = version;
        }
        if let Some(num_sequences) = self.num_sequences {
            header.num_sequences = num_sequences;
        }
        for entry in &self.parameters {
            header.parameters.append(entry.tag.clone(), entry.value.clone());
        }
        BarWriter::new(inner, header)
    }
}

/// Streaming writer for BAR files
pub struct BarWriter<W: Write> {
    inner: W,
    header: BarHeader,
    written: usize,
}
impl<W: Write> BarWriter<W> {
    /// Writes `header` and returns a writer positioned at the first sequence
    pub fn new(mut inner: W, header: BarHeader) -> Result<Self> {
        header.write_bytes(&mut inner)?;
        Ok(Self {
            inner,
            header,
            written: 0,
        })
    }

    #[must_use]
    pub fn header(&self) -> &BarHeader {
        &self.header
    }

    /// Number of sequences written so far
    #[must_use]
    pub fn num_written(&self) -> usize {
        self.written
    }

    /// Writes an owned sequence
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * More sequences are written than the header declares
    /// * A row does not have one value per column
    /// * The sequence rows live in a mapped file (use [`BarWriter::write_view`])
    pub fn write_sequence(&mut self, seq: &ResultSequence) -> Result<()> {
        let rows = match &seq.rows {
            RowStore::Owned(rows) => rows,
            // zero-width rows are only counted
            RowStore::Mapped(span) if span.stride == 0 && self.header.num_columns() == 0 => {
                self.check_count()?;
                self.write_preamble(seq, span.rows)?;
                self.written += 1;
                return Ok(());
            }
            RowStore::Mapped(_) => {
                return Err(WriteError::RowsNotOwned(seq.name.clone()).into());
            }
        };
        self.check_count()?;
        for row in rows {
            self.check_row(row.len())?;
        }
        self.write_preamble(seq, rows.len())?;
        for row in rows {
            self.write_row(row)?;
        }
        self.written += 1;
        Ok(())
    }

    /// Writes a sequence of an open file, copying or decoding its rows
    pub fn write_view(&mut self, view: &ResultSequenceView<'_>) -> Result<()> {
        self.check_count()?;
        self.check_row(view.num_columns())?;
        self.write_preamble(view.sequence(), view.num_rows())?;
        for row in view.rows() {
            self.write_row(&row?)?;
        }
        self.written += 1;
        Ok(())
    }

    /// Writes the footer, flushes, and returns the inner writer
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::SequenceCountMismatch`] when fewer sequences were written
    /// than the header declares.
    pub fn finish(mut self) -> Result<W> {
        if self.written != self.header.num_sequences {
            return Err(WriteError::SequenceCountMismatch {
                expected: self.header.num_sequences,
                got: self.written,
            }
            .into());
        }
        self.inner.write_all(FOOTER)?;
        self.inner.flush()?;
        debug!(
            sequences = self.written,
            columns = self.header.num_columns(),
            "wrote bar file"
        );
        Ok(self.inner)
    }

    pub fn by_ref(&mut self) -> &mut W {
        &mut self.inner
    }

    fn check_count(&self) -> Result<()> {
        if self.written >= self.header.num_sequences {
            return Err(WriteError::SequenceCountMismatch {
                expected: self.header.num_sequences,
                got: self.written + 1,
            }
            .into());
        }
        Ok(())
    }

    fn check_row(&self, got: usize) -> Result<()> {
        let expected = self.header.num_columns();
        if got != expected {
            return Err(WriteError::ColumnCountMismatch { expected, got }.into());
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn write_preamble(&mut self, seq: &ResultSequence, num_rows: usize) -> Result<()> {
        let version2 = self.header.is_version2();
        self.inner.write_string(&seq.name)?;
        if version2 {
            self.inner.write_string(&seq.group_name)?;
        }
        self.inner.write_string(&seq.version)?;
        if version2 {
            self.inner.write_int32(seq.parameters.len() as i32)?;
            seq.parameters.write_entries(&mut self.inner)?;
        }
        self.inner.write_int32(num_rows as i32)?;
        Ok(())
    }

    fn write_row(&mut self, row: &[ResultValue]) -> Result<()> {
        for (value, &column) in row.iter().zip(&self.header.columns) {
            self.inner.write_all(&value.encode(column))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::bar::BarFile;
    use crate::store::ByteSpan;
    use std::fs::File;

    fn one_row_seq(name: &str, cells: usize) -> ResultSequence {
        let mut seq = ResultSequence::new(name).version("v1");
        seq.add_row((0..cells).map(|i| ResultValue::Integer(i as i32)).collect());
        seq
    }

    #[test]
    fn test_missing_header() {
        let result = BarWriterBuilder::default().build(Vec::new());
        assert!(matches!(
            result,
            Err(crate::Error::WriteError(WriteError::MissingHeader))
        ));
    }

    #[test]
    fn test_header_overrides() -> Result<()> {
        let mut header = BarHeader::new(vec![ColumnType::Float]);
        header.parameters.append("a", "1");
        let writer = BarWriterBuilder::default()
            .header(header)
            .columns(vec![ColumnType::Integer, ColumnType::Float])
            .parameter("b", "2")
            .version(1.0)
            .build(Vec::new())?;
        assert_eq!(writer.header().num_columns(), 2);
        assert_eq!(writer.header().parameters.len(), 2);
        assert!(!writer.header().is_version2());
        Ok(())
    }

    #[test]
    fn test_count_checks() -> Result<()> {
        let mut writer = BarWriterBuilder::default()
            .columns(vec![ColumnType::Integer, ColumnType::Integer])
            .num_sequences(1)
            .build(Vec::new())?;
        assert!(matches!(
            writer.write_sequence(&one_row_seq("bad", 3)),
            Err(crate::Error::WriteError(WriteError::ColumnCountMismatch {
                expected: 2,
                got: 3
            }))
        ));
        assert_eq!(writer.num_written(), 0);

        writer.write_sequence(&one_row_seq("chr1", 2))?;
        assert!(writer.write_sequence(&one_row_seq("chr2", 2)).is_err());
        let bytes = writer.finish()?;
        assert_eq!(&bytes[bytes.len() - 4..], FOOTER);

        let writer = BarWriterBuilder::default()
            .columns(vec![ColumnType::Integer])
            .num_sequences(2)
            .build(Vec::new())?;
        assert!(matches!(
            writer.finish(),
            Err(crate::Error::WriteError(WriteError::SequenceCountMismatch {
                expected: 2,
                got: 0
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_rows_not_owned() -> Result<()> {
        let mut writer = BarWriterBuilder::default()
            .columns(vec![ColumnType::Integer])
            .num_sequences(1)
            .build(Vec::new())?;
        let detached = ResultSequence {
            rows: RowStore::Mapped(ByteSpan::new(0, 1, 4)),
            ..ResultSequence::new("chr1")
        };
        assert!(matches!(
            writer.write_sequence(&detached),
            Err(crate::Error::WriteError(WriteError::RowsNotOwned(_)))
        ));
        Ok(())
    }

    #[test]
    fn test_counted_rows_without_columns() -> Result<()> {
        let mut writer = BarWriterBuilder::default()
            .columns(vec![])
            .num_sequences(1)
            .build(Vec::new())?;
        let counted = ResultSequence {
            rows: RowStore::Mapped(ByteSpan::new(0, 5, 0)),
            ..ResultSequence::new("chr1")
        };
        writer.write_sequence(&counted)?;
        let bytes = writer.finish()?;
        // row count sits right before the footer, with no cells after it
        assert_eq!(&bytes[bytes.len() - 8..bytes.len() - 4], &5i32.to_be_bytes());
        Ok(())
    }

    #[test]
    fn test_copy_from_mapped_view() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("source.bar");
        let target = dir.path().join("target.bar");

        let mut writer = BarWriterBuilder::default()
            .columns(vec![ColumnType::Integer, ColumnType::Float])
            .parameter("program", "tilebin")
            .num_sequences(2)
            .build(File::create(&source)?)?;
        let mut chr1 = ResultSequence::new("chr1").group_name("Hs").version("hg19");
        chr1.add_row(vec![ResultValue::Integer(10), ResultValue::Float(1.5)]);
        chr1.add_row(vec![ResultValue::Integer(45), ResultValue::Float(-0.25)]);
        writer.write_sequence(&chr1)?;
        writer.write_sequence(&ResultSequence::new("chrM"))?;
        writer.finish()?;

        let mut mapped = BarFile::with_options(&source, crate::ReadOptions::mapped());
        mapped.read()?;
        let mut copy = BarWriter::new(File::create(&target)?, mapped.header().clone())?;
        for view in mapped.sequences() {
            copy.write_view(&view)?;
        }
        copy.finish()?;

        assert_eq!(std::fs::read(&source)?, std::fs::read(&target)?);
        Ok(())
    }
}
