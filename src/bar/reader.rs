//! BAR file reader
//!
//! Mirrors [`crate::BpmapFile`]: `read_header` stops after the column types and file
//! parameters, `read` continues through every sequence. In mapped mode only the
//! sequence preambles are parsed and cells are decoded on access.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::column::{ColumnType, ResultValue, CELL_SIZE};
use super::header::{read_count, BarHeader};
use super::sequence::{ResultSequence, ResultSequenceView};
use crate::codec::TableRead;
use crate::config::ReadOptions;
use crate::error::{ReadError, Result};
use crate::params::ParameterList;
use crate::region::MappedRegion;
use crate::store::{ByteSpan, RowStore, TableState};

#[derive(Debug, Default)]
pub struct BarFile {
    file_name: PathBuf,
    options: ReadOptions,
    state: TableState,
    header: BarHeader,
    data_start: u64,
    sequences: Vec<ResultSequence>,
    region: Option<MappedRegion>,
    error: String,
}
impl BarFile {
    /// Creates a closed file object for `path` with copy-mode options
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_options(path, ReadOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(path: P, options: ReadOptions) -> Self {
        Self {
            file_name: path.as_ref().to_path_buf(),
            options,
            ..Self::default()
        }
    }

    /// Points the object at a new file, closing whatever was open
    pub fn set_file_name<P: AsRef<Path>>(&mut self, path: P) {
        self.close();
        self.file_name = path.as_ref().to_path_buf();
    }

    #[must_use]
    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn set_options(&mut self, options: ReadOptions) {
        self.close();
        self.options = options;
    }

    #[must_use]
    pub fn options(&self) -> ReadOptions {
        self.options
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.file_name.is_file()
    }

    #[must_use]
    pub fn state(&self) -> TableState {
        self.state
    }

    #[must_use]
    pub fn header(&self) -> &BarHeader {
        &self.header
    }

    #[must_use]
    pub fn version(&self) -> f32 {
        self.header.version
    }

    #[must_use]
    pub fn num_sequences(&self) -> usize {
        self.header.num_sequences
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.header.num_columns()
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnType] {
        &self.header.columns
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterList {
        &self.header.parameters
    }

    /// Sum of the declared column widths
    ///
    /// # Errors
    ///
    /// Fails when a column is declared `Double`.
    pub fn data_row_size(&self) -> Result<usize> {
        self.header.data_row_size()
    }

    /// The last failure message, kept across `close`
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error
    }

    pub fn read_header(&mut self) -> Result<()> {
        self.close();
        self.error.clear();
        let result = self.read_header_inner();
        self.settle(result)
    }

    pub fn read(&mut self) -> Result<()> {
        self.close();
        self.error.clear();
        let result = self
            .read_header_inner()
            .and_then(|()| self.read_data_section());
        self.settle(result)
    }

    /// Releases every sequence and any mapped region
    pub fn close(&mut self) {
        self.state = TableState::Closed;
        self.header = BarHeader::default();
        self.header.version = 0.0;
        self.data_start = 0;
        self.sequences = Vec::new();
        self.region = None;
    }

    pub fn sequence(&self, index: usize) -> Result<ResultSequenceView<'_>> {
        if self.state != TableState::DataRead {
            return Err(ReadError::DataNotRead.into());
        }
        if index >= self.sequences.len() {
            return Err(ReadError::OutOfRange {
                requested_index: index,
                max_index: self.sequences.len(),
            }
            .into());
        }
        Ok(ResultSequenceView::new(self, index))
    }

    pub fn sequences(&self) -> impl ExactSizeIterator<Item = ResultSequenceView<'_>> + '_ {
        (0..self.items().len()).map(move |index| ResultSequenceView::new(self, index))
    }

    pub(crate) fn items(&self) -> &[ResultSequence] {
        if self.state == TableState::DataRead {
            &self.sequences
        } else {
            &[]
        }
    }

    pub(crate) fn region(&self) -> Option<&MappedRegion> {
        self.region.as_ref()
    }

    fn settle(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            self.close();
            self.error = e.to_string();
            debug!(file = ?self.file_name, error = %e, "bar read failed");
        }
        result
    }

    fn open(&self) -> Result<BufReader<File>> {
        let file = File::open(&self.file_name)
            .map_err(|e| ReadError::UnableToOpen(self.file_name.clone(), e))?;
        Ok(BufReader::new(file))
    }

    fn read_header_inner(&mut self) -> Result<()> {
        let mut reader = self.open()?;
        self.header = BarHeader::from_reader(&mut reader)?;
        self.data_start = reader.stream_position()?;
        self.state = TableState::HeaderRead;
        debug!(
            version = self.header.version,
            sequences = self.header.num_sequences,
            columns = self.header.num_columns(),
            "read bar header"
        );
        Ok(())
    }

    fn read_data_section(&mut self) -> Result<()> {
        if self.options.is_mapped() {
            // rejects columns without a fixed width before any offsets are computed
            let declared = self.header.data_row_size()?;
            let region = MappedRegion::open(&self.file_name, &self.options)?;
            let sequences = self.parse_sequences(&mut std::io::Cursor::new(&region[..]), true)?;
            debug!(declared, stride = self.header.wire_row_size(), "mapped bar rows");
            self.sequences = sequences;
            self.region = Some(region);
        } else {
            let mut reader = self.open()?;
            self.sequences = self.parse_sequences(&mut reader, false)?;
        }
        self.state = TableState::DataRead;
        debug!(
            sequences = self.sequences.len(),
            mapped = self.options.is_mapped(),
            "read bar data"
        );
        Ok(())
    }

    fn parse_sequences<R: Read + Seek>(
        &self,
        reader: &mut R,
        mapped: bool,
    ) -> Result<Vec<ResultSequence>> {
        let header = &self.header;
        let version2 = header.is_version2();
        let stride = header.wire_row_size();
        let len = reader.seek(SeekFrom::End(0))? as usize;
        reader.seek(SeekFrom::Start(self.data_start))?;

        let mut sequences = Vec::new();
        for _ in 0..header.num_sequences {
            let mut seq = ResultSequence::new(reader.read_string("sequence name")?);
            if version2 {
                seq.group_name = reader.read_string("group name")?;
            }
            seq.version = reader.read_string("sequence version")?;
            if version2 {
                let count = read_count(reader, "parameter")?;
                seq.parameters = ParameterList::read_entries(reader, count)?;
            }
            let num_rows = read_count(reader, "row")?;

            // the declared rows must fit in the file before anything is allocated
            let span = ByteSpan::new(reader.stream_position()? as usize, num_rows, stride);
            if span.end() > len {
                return Err(ReadError::FileTruncation {
                    end: span.end(),
                    len,
                }
                .into());
            }

            // zero-width rows carry no cells, so only their count is kept
            if mapped || span.stride == 0 {
                reader.seek(SeekFrom::Start(span.end() as u64))?;
                seq.rows = RowStore::Mapped(span);
            } else {
                let mut rows = Vec::with_capacity(num_rows);
                for _ in 0..num_rows {
                    let mut row = Vec::with_capacity(header.columns.len());
                    for &column in &header.columns {
                        let cell = reader.read_fixed::<CELL_SIZE>("cell")?;
                        row.push(ResultValue::decode(column, cell));
                    }
                    rows.push(row);
                }
                seq.rows = RowStore::Owned(rows);
            }
            sequences.push(seq);
        }
        Ok(sequences)
    }
}
