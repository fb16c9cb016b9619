//! BAR file header
//!
//! Unlike BPMAP the header has a variable size: after the magic, version, and
//! sequence count comes the column type list and the file parameters.

use std::io::{Read, Write};

use crate::codec::{FloatMode, TableRead, TableWrite};
use crate::error::{HeaderError, Result};
use crate::params::ParameterList;

use super::column::{data_row_size, ColumnType, CELL_SIZE};

/// Magic bytes opening every BAR file
pub const MAGIC: &[u8; 8] = b"barr\r\n\x1a\n";

/// Version written by default
pub const DEFAULT_VERSION: f32 = 2.0;

/// Footer written after the last sequence
pub const FOOTER: &[u8; 4] = b"END\n";

#[derive(Debug, Clone, PartialEq)]
pub struct BarHeader {
    /// Format version
    pub version: f32,
    /// Number of sequences declared by the file
    pub num_sequences: usize,
    /// Type of every column, shared by all sequences
    pub columns: Vec<ColumnType>,
    /// File-level parameters
    pub parameters: ParameterList,
}
impl Default for BarHeader {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
impl BarHeader {
    #[must_use]
    pub fn new(columns: Vec<ColumnType>) -> Self {
        Self {
            version: DEFAULT_VERSION,
            num_sequences: 0,
            columns,
            parameters: ParameterList::new(),
        }
    }

    /// Sequences carry a group name and parameters
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn is_version2(&self) -> bool {
        (self.version + 0.1) as i32 == 2
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Sum of the declared column widths
    pub fn data_row_size(&self) -> Result<usize> {
        data_row_size(&self.columns)
    }

    /// Bytes a row occupies on disk
    #[must_use]
    pub fn wire_row_size(&self) -> usize {
        CELL_SIZE * self.columns.len()
    }

    /// Reads and validates a header from the start of a stream
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic bytes do not match [`MAGIC`]
    /// * The version is negative or not finite
    /// * A count is negative or a column code is unknown
    /// * The stream ends early
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_fixed::<8>("bar magic")?;
        if &magic != MAGIC {
            return Err(HeaderError::InvalidMagic {
                expected: MAGIC,
                found: magic.to_vec(),
            }
            .into());
        }

        let version = reader.read_float(FloatMode::Current, "version")?;
        if !version.is_finite() || version < 0.0 {
            return Err(HeaderError::InvalidFormatVersion(version).into());
        }
        let num_sequences = read_count(reader, "sequence")?;

        let num_columns = read_count(reader, "column")?;
        let mut columns = Vec::new();
        for _ in 0..num_columns {
            columns.push(ColumnType::from_code(reader.read_int32("column type")?)?);
        }

        let num_params = read_count(reader, "parameter")?;
        let parameters = ParameterList::read_entries(reader, num_params)?;

        Ok(Self {
            version,
            num_sequences,
            columns,
            parameters,
        })
    }

    #[allow(clippy::cast_possible_wrap)]
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_float(self.version, FloatMode::Current)?;
        writer.write_int32(self.num_sequences as i32)?;
        writer.write_int32(self.columns.len() as i32)?;
        for column in &self.columns {
            writer.write_int32(column.code())?;
        }
        writer.write_int32(self.parameters.len() as i32)?;
        self.parameters.write_entries(writer)
    }
}

/// Reads an `int32` count, rejecting negative values
pub(crate) fn read_count<R: Read>(reader: &mut R, field: &'static str) -> Result<usize> {
    let value = reader.read_int32(field)?;
    usize::try_from(value).map_err(|_| HeaderError::NegativeCount { field, value }.into())
}
