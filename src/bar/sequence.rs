use crate::codec::{float_at, int32_at, FloatMode};
use crate::error::{ReadError, Result};
use crate::params::ParameterList;
use crate::store::RowStore;

use super::column::{ColumnType, ResultValue, CELL_SIZE};
use super::reader::BarFile;

/// One named block of result rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSequence {
    pub(crate) name: String,
    pub(crate) group_name: String,
    pub(crate) version: String,
    pub(crate) parameters: ParameterList,
    pub(crate) rows: RowStore<Vec<ResultValue>>,
}
impl ResultSequence {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
    #[must_use]
    pub fn group_name(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = group_name.into();
        self
    }
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
    #[must_use]
    pub fn parameters(mut self, parameters: ParameterList) -> Self {
        self.parameters = parameters;
        self
    }

    /// Appends a row of cells
    ///
    /// A sequence cloned out of a mapped file holds no rows of its own, so the first
    /// added row starts a fresh owned row set.
    pub fn add_row(&mut self, row: Vec<ResultValue>) {
        if let RowStore::Owned(rows) = &mut self.rows {
            rows.push(row);
        } else {
            self.rows = RowStore::Owned(vec![row]);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn group(&self) -> &str {
        &self.group_name
    }
    pub fn seq_version(&self) -> &str {
        &self.version
    }
    pub fn params(&self) -> &ParameterList {
        &self.parameters
    }
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Owned rows
    ///
    /// `None` when the rows live in a mapped file or the file declares no columns, in
    /// which case only [`ResultSequence::num_rows`] is kept.
    pub fn rows(&self) -> Option<&[Vec<ResultValue>]> {
        self.rows.owned()
    }

    /// `group:version;name`, or just the name when there is no version
    pub fn full_name(&self) -> String {
        if self.version.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{};{}", self.group_name, self.version, self.name)
        }
    }
}

/// Non-owning handle to a sequence of an open [`BarFile`]
#[derive(Debug, Clone, Copy)]
pub struct ResultSequenceView<'a> {
    file: &'a BarFile,
    index: usize,
}
impl<'a> ResultSequenceView<'a> {
    pub(crate) fn new(file: &'a BarFile, index: usize) -> Self {
        Self { file, index }
    }

    fn item(&self) -> &'a ResultSequence {
        &self.file.items()[self.index]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
    #[must_use]
    pub fn sequence(&self) -> &'a ResultSequence {
        self.item()
    }
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.item().name
    }
    #[must_use]
    pub fn group_name(&self) -> &'a str {
        &self.item().group_name
    }
    #[must_use]
    pub fn version(&self) -> &'a str {
        &self.item().version
    }
    #[must_use]
    pub fn full_name(&self) -> String {
        self.item().full_name()
    }
    #[must_use]
    pub fn parameters(&self) -> &'a ParameterList {
        &self.item().parameters
    }
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.item().rows.len()
    }
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.file.columns().len()
    }

    /// Column types shared by every sequence of the file
    #[must_use]
    pub fn column_types(&self) -> &'a [ColumnType] {
        self.file.columns()
    }

    /// Absolute file offset of a mapped cell
    #[must_use]
    pub fn data_offset(&self, row: usize, col: usize) -> Option<usize> {
        let span = self.item().rows.span()?;
        (row < span.rows && col < self.num_columns())
            .then(|| span.row_offset(row) + col * CELL_SIZE)
    }

    /// Returns the cell at (`row`, `col`)
    ///
    /// `Integer` columns yield [`ResultValue::Integer`]; every other column yields
    /// [`ResultValue::Float`].
    pub fn data(&self, row: usize, col: usize) -> Result<ResultValue> {
        let columns = self.column_types();
        let Some(&column) = columns.get(col) else {
            return Err(ReadError::OutOfRange {
                requested_index: col,
                max_index: columns.len(),
            }
            .into());
        };
        match &self.item().rows {
            RowStore::Owned(rows) => rows
                .get(row)
                .and_then(|cells| cells.get(col))
                .copied()
                .ok_or_else(|| {
                    ReadError::OutOfRange {
                        requested_index: row,
                        max_index: rows.len(),
                    }
                    .into()
                }),
            RowStore::Mapped(span) => {
                let region = self.file.region().ok_or(ReadError::DataNotRead)?;
                let bytes = span.row(region, row)?;
                let offset = col * CELL_SIZE;
                Ok(if column.is_integer() {
                    ResultValue::Integer(int32_at(bytes, offset))
                } else {
                    ResultValue::Float(float_at(bytes, offset, FloatMode::Current))
                })
            }
        }
    }

    /// Returns every cell of `row`
    pub fn row(&self, row: usize) -> Result<Vec<ResultValue>> {
        let num_rows = self.num_rows();
        if row >= num_rows {
            return Err(ReadError::OutOfRange {
                requested_index: row,
                max_index: num_rows,
            }
            .into());
        }
        (0..self.num_columns()).map(|col| self.data(row, col)).collect()
    }

    /// Iterates over the rows of the sequence
    #[must_use]
    pub fn rows(&self) -> RowIter<'a> {
        RowIter {
            view: *self,
            pos: 0,
        }
    }
}

/// Iterator over the rows of a [`ResultSequenceView`]
pub struct RowIter<'a> {
    view: ResultSequenceView<'a>,
    pos: usize,
}
impl Iterator for RowIter<'_> {
    type Item = Result<Vec<ResultValue>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.view.num_rows() {
            return None;
        }
        let row = self.view.row(self.pos);
        self.pos += 1;
        Some(row)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.num_rows().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}
impl ExactSizeIterator for RowIter<'_> {}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::store::ByteSpan;

    #[test]
    fn test_full_name() {
        let seq = ResultSequence::new("chr4").group_name("At").version("TAIR9");
        assert_eq!(seq.full_name(), "At:TAIR9;chr4");
        assert_eq!(ResultSequence::new("chr4").full_name(), "chr4");
    }

    #[test]
    fn test_add_row() {
        let mut seq = ResultSequence::new("chr1");
        seq.add_row(vec![ResultValue::Integer(1), ResultValue::Float(0.5)]);
        seq.add_row(vec![ResultValue::Integer(2), ResultValue::Float(0.25)]);
        assert_eq!(seq.num_rows(), 2);
        assert_eq!(seq.rows().unwrap()[1][1], ResultValue::Float(0.25));

        let mut detached = ResultSequence {
            rows: RowStore::Mapped(ByteSpan::new(100, 4, 8)),
            ..ResultSequence::new("chr2")
        };
        assert!(detached.rows().is_none());
        detached.add_row(vec![ResultValue::Integer(9)]);
        assert_eq!(detached.num_rows(), 1);
    }
}
