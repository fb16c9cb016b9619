//! BPMAP file header
//!
//! The header is a fixed 16 bytes: an 8-byte magic string, a 4-byte version float,
//! and a 4-byte sequence count. Early writers stored the version (and every match
//! score in the file) in the legacy float encoding, so the version is first decoded
//! that way and re-decoded as a current float when the result is implausible.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder};
use tracing::debug;

use crate::codec::FloatMode;
use crate::error::{HeaderError, ReadError, Result};

/// Magic bytes opening every BPMAP file
pub const MAGIC: &[u8; 8] = b"PHT7\r\n\x1a\n";

/// Size of the header in bytes
pub const SIZE_HEADER: usize = 16;

/// Version written by default
pub const DEFAULT_VERSION: f32 = 3.0;

/// Range of versions accepted from the legacy decode
const PLAUSIBLE_VERSIONS: std::ops::RangeInclusive<f32> = 0.5..=3.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmapHeader {
    /// Format version
    ///
    /// 4 bytes
    pub version: f32,

    /// Float decoding used by this file for the version and every match score
    ///
    /// Not stored on disk; inferred from the version bytes.
    pub float_mode: FloatMode,

    /// Number of sequences in the file
    ///
    /// 4 bytes
    pub num_sequences: u32,
}
impl Default for BpmapHeader {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION, 0)
    }
}
impl BpmapHeader {
    #[must_use]
    pub fn new(version: f32, num_sequences: u32) -> Self {
        Self {
            version,
            float_mode: FloatMode::Current,
            num_sequences,
        }
    }

    /// Sequence descriptions carry a pairing code and hit offset
    #[must_use]
    pub fn has_pairing(&self) -> bool {
        self.version >= 3.0
    }

    /// Hit sections are located through the stored hit offset instead of stream order
    #[must_use]
    pub fn seeks_hit_start(&self) -> bool {
        self.version > 3.0
    }

    /// Sequence descriptions carry group, version, and parameters
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn has_group_metadata(&self) -> bool {
        (self.version + 0.1) as i32 >= 2
    }

    /// Parses a header from a fixed-size byte array
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic bytes do not match [`MAGIC`]
    /// * The version decodes to a negative or non-finite value
    pub fn from_bytes(buffer: &[u8; SIZE_HEADER]) -> Result<Self> {
        if &buffer[0..8] != MAGIC {
            return Err(HeaderError::InvalidMagic {
                expected: MAGIC,
                found: buffer[0..8].to_vec(),
            }
            .into());
        }

        let mut raw = [0u8; 4];
        raw.copy_from_slice(&buffer[8..12]);
        let mut float_mode = FloatMode::Legacy;
        let mut version = float_mode.decode(raw);
        if !PLAUSIBLE_VERSIONS.contains(&version) {
            float_mode = FloatMode::Current;
            version = float_mode.decode(raw);
            debug!(version, "legacy version decode implausible, using current floats");
        }
        if !version.is_finite() || version < 0.0 {
            return Err(HeaderError::InvalidFormatVersion(version).into());
        }

        Ok(Self {
            version,
            float_mode,
            num_sequences: BigEndian::read_u32(&buffer[12..16]),
        })
    }

    /// Parses a header from the start of a buffer of any size
    pub fn from_buffer(buffer: &[u8]) -> Result<Self> {
        let Some(head) = buffer.get(..SIZE_HEADER) else {
            return Err(ReadError::ShortRead {
                field: "bpmap header",
                needed: SIZE_HEADER,
            }
            .into());
        };
        let mut bytes = [0u8; SIZE_HEADER];
        bytes.copy_from_slice(head);
        Self::from_bytes(&bytes)
    }

    /// Reads exactly [`SIZE_HEADER`] bytes and parses them
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_HEADER];
        reader.read_exact(&mut buffer).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ReadError::ShortRead {
                    field: "bpmap header",
                    needed: SIZE_HEADER,
                }
                .into()
            } else {
                crate::Error::from(e)
            }
        })?;
        Self::from_bytes(&buffer)
    }

    /// Writes the header using its float mode for the version
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_HEADER];
        buffer[0..8].copy_from_slice(MAGIC);
        buffer[8..12].copy_from_slice(&self.float_mode.encode(self.version));
        BigEndian::write_u32(&mut buffer[12..16], self.num_sequences);
        writer.write_all(&buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    fn encode(header: &BpmapHeader) -> Vec<u8> {
        let mut buf = Vec::new();
        header.write_bytes(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_current_version_falls_back() -> Result<()> {
        let header = BpmapHeader::new(3.0, 4);
        let decoded = BpmapHeader::from_buffer(&encode(&header))?;
        assert_eq!(decoded.version, 3.0);
        assert_eq!(decoded.float_mode, FloatMode::Current);
        assert_eq!(decoded.num_sequences, 4);
        Ok(())
    }

    #[test]
    fn test_legacy_version_kept() -> Result<()> {
        let mut header = BpmapHeader::new(2.0, 1);
        header.float_mode = FloatMode::Legacy;
        let decoded = BpmapHeader::from_buffer(&encode(&header))?;
        assert_eq!(decoded.version, 2.0);
        assert_eq!(decoded.float_mode, FloatMode::Legacy);
        Ok(())
    }

    #[test]
    fn test_invalid_magic() {
        let mut buf = encode(&BpmapHeader::default());
        buf[0] = b'X';
        assert!(matches!(
            BpmapHeader::from_buffer(&buf),
            Err(crate::Error::HeaderError(HeaderError::InvalidMagic { .. }))
        ));
    }

    #[test]
    fn test_negative_version() {
        let buf = encode(&BpmapHeader::new(-2.0, 0));
        assert!(BpmapHeader::from_buffer(&buf).is_err());
    }

    #[test]
    fn test_truncated() {
        let buf = encode(&BpmapHeader::default());
        let err = BpmapHeader::from_reader(&mut &buf[..11]).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_layout_flags() {
        let v1 = BpmapHeader::new(1.0, 0);
        assert!(!v1.has_pairing() && !v1.has_group_metadata());

        let v2 = BpmapHeader::new(1.95, 0);
        assert!(v2.has_group_metadata());
        assert!(!v2.has_pairing());

        let v3 = BpmapHeader::new(3.0, 0);
        assert!(v3.has_pairing() && !v3.seeks_hit_start());

        let v31 = BpmapHeader::new(3.1, 0);
        assert!(v31.seeks_hit_start());
    }
}
