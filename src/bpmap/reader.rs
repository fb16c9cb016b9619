//! BPMAP file reader
//!
//! A [`BpmapFile`] walks through three states. `read_header` validates the magic
//! and version and records the sequence count. `read` parses every sequence
//! description and then either decodes all hits into memory (copy mode) or records
//! where each sequence's hits live in the file bytes (mapped mode). Any failure
//! closes the file and keeps the error message.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::header::{BpmapHeader, SIZE_HEADER};
use super::hit::{HitRow, ProbePairing};
use super::sequence::{SequenceItem, SequenceView};
use crate::codec::{FloatMode, TableRead};
use crate::config::ReadOptions;
use crate::error::{ReadError, Result};
use crate::params::ParameterList;
use crate::region::MappedRegion;
use crate::store::{ByteSpan, RowStore, TableState};

#[derive(Debug, Default)]
pub struct BpmapFile {
    file_name: PathBuf,
    options: ReadOptions,
    state: TableState,
    header: BpmapHeader,
    data_start: u64,
    sequences: Vec<SequenceItem>,
    region: Option<MappedRegion>,
    error: String,
}
impl BpmapFile {
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

    /// Checks if the file exists on disk
    #[must_use]
    pub fn exists(&self) -> bool {
        self.file_name.is_file()
    }

    #[must_use]
    pub fn state(&self) -> TableState {
        self.state
    }

    #[must_use]
    pub fn header(&self) -> &BpmapHeader {
        &self.header
    }

    #[must_use]
    pub fn version(&self) -> f32 {
        self.header.version
    }

    #[must_use]
    pub fn float_mode(&self) -> FloatMode {
        self.header.float_mode
    }

    #[must_use]
    pub fn num_sequences(&self) -> usize {
        self.header.num_sequences as usize
    }

    /// The last failure message, kept across `close`
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error
    }

    /// Reads and validates the header
    pub fn read_header(&mut self) -> Result<()> {
        self.close();
        self.error.clear();
        let result = self.read_header_inner();
        self.settle(result)
    }

    /// Reads the header and every sequence
    pub fn read(&mut self) -> Result<()> {
        self.close();
        self.error.clear();
        let result = self
            .read_header_inner()
            .and_then(|()| self.read_data_section());
        self.settle(result)
    }

    /// Releases every sequence and any mapped region
    ///
    /// Safe to call repeatedly and on a file that was never opened.
    pub fn close(&mut self) {
        self.state = TableState::Closed;
        self.header = BpmapHeader::new(0.0, 0);
        self.data_start = 0;
        self.sequences = Vec::new();
        self.region = None;
    }

    /// Returns a view of sequence `index`
    pub fn sequence(&self, index: usize) -> Result<SequenceView<'_>> {
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
        Ok(SequenceView::new(self, index))
    }

    /// Iterates over views of every sequence
    pub fn sequences(&self) -> impl ExactSizeIterator<Item = SequenceView<'_>> + '_ {
        (0..self.items().len()).map(move |index| SequenceView::new(self, index))
    }

    pub(crate) fn items(&self) -> &[SequenceItem] {
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
            debug!(file = ?self.file_name, error = %e, "bpmap read failed");
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
        self.header = BpmapHeader::from_reader(&mut reader)?;
        self.data_start = SIZE_HEADER as u64;
        self.state = TableState::HeaderRead;
        debug!(
            version = self.header.version,
            float_mode = ?self.header.float_mode,
            sequences = self.header.num_sequences,
            "read bpmap header"
        );
        Ok(())
    }

    fn read_data_section(&mut self) -> Result<()> {
        if self.options.is_mapped() {
            let region = MappedRegion::open(&self.file_name, &self.options)?;
            let sequences = self.parse_sequences(&mut std::io::Cursor::new(&region[..]), true)?;
            for item in &sequences {
                if let Some(span) = item.hits.span() {
                    region.check_span(span.offset, span.len())?;
                }
            }
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
            "read bpmap data"
        );
        Ok(())
    }

    fn parse_sequences<R: Read + Seek>(
        &self,
        reader: &mut R,
        mapped: bool,
    ) -> Result<Vec<SequenceItem>> {
        let header = self.header;
        reader.seek(SeekFrom::Start(self.data_start))?;

        let mut sequences = Vec::new();
        for _ in 0..header.num_sequences {
            let mut item = SequenceItem::new(reader.read_string("sequence name")?);
            if header.has_pairing() {
                item.pairing = ProbePairing::from_code(reader.read_uint32("probe pairing")?);
                item.hit_start_position = reader.read_uint32("hit start position")?;
            }
            item.num_hits = reader.read_uint32("hit count")?;
            if header.has_group_metadata() {
                item.group_name = reader.read_string("group name")?;
                item.seq_version = reader.read_string("sequence version")?;
                let count = reader.read_uint32("parameter count")?;
                item.parameters = ParameterList::read_entries(reader, count as usize)?;
            }
            sequences.push(item);
        }

        for item in &mut sequences {
            if header.seeks_hit_start() {
                reader.seek(SeekFrom::Start(u64::from(item.hit_start_position)))?;
                item.number = reader.read_uint32("sequence number")?;
            } else {
                item.number = reader.read_uint32("sequence number")?;
                item.hit_start_position = hit_offset(reader.stream_position()?)?;
            }

            let rows_start = reader.stream_position()?;
            if mapped {
                let span = ByteSpan::new(
                    rows_start as usize,
                    item.num_hits as usize,
                    item.pairing.row_size(),
                );
                reader.seek(SeekFrom::Current(span.len() as i64))?;
                item.hits = RowStore::Mapped(span);
            } else {
                let mut hits = Vec::new();
                for _ in 0..item.num_hits {
                    hits.push(HitRow::from_reader(reader, item.pairing, header.float_mode)?);
                }
                item.hits = RowStore::Owned(hits);
            }
        }
        Ok(sequences)
    }
}

/// Narrows a stream position to the 32-bit hit offset the format stores
fn hit_offset(position: u64) -> Result<u32> {
    u32::try_from(position).map_err(|_| ReadError::HitOffsetOverflow(position).into())
}
