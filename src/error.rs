use std::path::PathBuf;

use crate::bar::ColumnType;

/// Custom Result type for tilebin operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the tilebin library, encompassing all possible error cases
/// that can occur while reading or writing BPMAP and BAR files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to file header processing
    #[error("Error processing header: {0}")]
    HeaderError(#[from] HeaderError),

    /// Errors that occur during read operations
    #[error("Error reading file: {0}")]
    ReadError(#[from] ReadError),

    /// Errors that occur during write operations
    #[error("Error writing file: {0}")]
    WriteError(#[from] WriteError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// UTF-8 conversion errors for length-prefixed strings
    #[error("Error with UTF8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}
impl Error {
    /// Checks if the error was caused by running out of bytes
    ///
    /// This covers short reads on a stream as well as mapped geometry that
    /// points past the end of the file.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            Self::ReadError(ReadError::ShortRead { .. } | ReadError::FileTruncation { .. })
        )
    }
}

/// Errors specific to processing and validating file headers
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic bytes at the start of the file do not match the format
    #[error("Invalid magic bytes: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        expected: &'static [u8],
        found: Vec<u8>,
    },

    /// The format version is negative or not a number
    #[error("Invalid format version: {0}")]
    InvalidFormatVersion(f32),

    /// A count field in the header is negative
    #[error("Invalid {field} count: {value}")]
    NegativeCount { field: &'static str, value: i32 },

    /// A column type tag is outside the known set
    #[error("Invalid column type code: {0}")]
    InvalidColumnType(i32),

    /// A column type has no fixed on-disk width
    #[error("Column type {0:?} has no fixed on-disk width")]
    UnsupportedColumnType(ColumnType),
}

/// Errors that can occur while reading BPMAP and BAR files
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file could not be opened
    #[error("Unable to open the file {0:?}")]
    UnableToOpen(PathBuf, #[source] std::io::Error),

    /// The file could not be memory mapped
    #[error("Unable to map the file {0:?} into memory")]
    MappingFailure(PathBuf, #[source] std::io::Error),

    /// The stream ended before a required field was complete
    ///
    /// # Fields
    /// * `field` - The field being decoded
    /// * `needed` - The number of bytes the field requires
    #[error("Stream ended while reading {field} ({needed} bytes required)")]
    ShortRead { field: &'static str, needed: usize },

    /// The declared geometry points past the end of the mapped file
    #[error("Declared data ends at byte {end} but the file is only {len} bytes")]
    FileTruncation { end: usize, len: usize },

    /// Attempted to access a sequence, hit, row, or column beyond the available range
    #[error("Requested index ({requested_index}) is out of range ({max_index})")]
    OutOfRange {
        requested_index: usize,
        max_index: usize,
    },

    /// The table has not reached the state the operation requires
    #[error("Operation requires the data section to be read first")]
    DataNotRead,

    /// A probe declares more bases than the packed blob can hold
    #[error("Probe length ({length}) exceeds the packed capacity ({capacity})")]
    ProbeTooLong { length: usize, capacity: usize },

    /// A line of a text probe map could not be parsed
    #[error("Invalid probe map line {line}: {reason}")]
    InvalidTpmapLine { line: usize, reason: String },

    /// A hit section begins past the 32-bit offsets the format stores
    #[error("Hit offset {0} does not fit in a 32-bit field")]
    HitOffsetOverflow(u64),
}

/// Errors that can occur while writing BPMAP and BAR files
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// The probe sequence contains invalid nucleotide characters
    ///
    /// # Arguments
    /// * `String` - The offending probe sequence
    #[error("Invalid nucleotides found in probe: {0}")]
    InvalidNucleotideSequence(String),

    /// A probe is longer than the packed capacity
    #[error("Probe length ({length}) exceeds the packed capacity ({capacity})")]
    ProbeTooLong { length: usize, capacity: usize },

    /// PM-only pairing is only representable from version 3.0 onwards
    #[error("PM-only sequences require format version 3.0 or later (found {0})")]
    PairingRequiresVersion3(f32),

    /// A row does not have one value per declared column
    #[error("Row has {got} values but the file declares {expected} columns")]
    ColumnCountMismatch { expected: usize, got: usize },

    /// The number of sequences written differs from the header declaration
    #[error("Header declares {expected} sequences but {got} were written")]
    SequenceCountMismatch { expected: usize, got: usize },

    /// A sequence taken from a mapped file carries no rows of its own
    #[error("Sequence {0} holds no owned rows; write it through its file view")]
    RowsNotOwned(String),

    /// A sequence index does not refer to a sequence in the writer
    #[error("Sequence index ({0}) has not been added to the writer")]
    UnknownSequence(usize),

    /// Attempted to build a writer without its header
    #[error("Missing header in writer builder")]
    MissingHeader,

    /// A count or offset does not fit in its 32-bit field
    #[error("{field} ({value}) does not fit in a 32-bit field")]
    FieldOverflow { field: &'static str, value: usize },
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_truncation_predicate() {
        let err: Error = ReadError::ShortRead {
            field: "name",
            needed: 4,
        }
        .into();
        assert!(err.is_truncation());

        let err: Error = ReadError::FileTruncation { end: 100, len: 80 }.into();
        assert!(err.is_truncation());

        let err: Error = HeaderError::InvalidColumnType(9).into();
        assert!(!err.is_truncation());
    }

    #[test]
    fn test_display_messages() {
        let err = HeaderError::InvalidMagic {
            expected: b"barr",
            found: b"nope".to_vec(),
        };
        assert!(err.to_string().contains("Invalid magic"));

        let err = HeaderError::UnsupportedColumnType(ColumnType::Double);
        assert!(err.to_string().contains("Double"));

        let err = ReadError::OutOfRange {
            requested_index: 12,
            max_index: 3,
        };
        let display = err.to_string();
        assert!(display.contains("12"));
        assert!(display.contains('3'));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        match err {
            Error::IoError(inner) => assert_eq!(inner.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected IoError variant"),
        }
    }
}
