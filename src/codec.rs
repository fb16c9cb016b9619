//! Big-endian primitive codec
//!
//! Every multi-byte field in the BPMAP and BAR formats is stored in network byte
//! order. This module offers two ways to get at them:
//!
//! 1. [`TableRead`] / [`TableWrite`], extension traits over any [`Read`] or [`Write`]
//!    that advance the stream by exactly the size of the primitive.
//! 2. Address-based helpers ([`int32_at`], [`float_at`]) that decode a cell at a byte
//!    offset of a mapped BAR row. BPMAP hit rows are read from mapped bytes through
//!    the `bytemuck` row structs in [`crate::bpmap`] instead.
//!
//! Floats may be stored in a legacy encoding produced by early BPMAP writers, which
//! pushed the value through an integer byte-swap. [`FloatMode`] selects the decode.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, ReadError, Result};

/// Float decoding selected once per file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatMode {
    /// IEEE-754 single precision in big-endian byte order
    #[default]
    Current,
    /// Historical encoding where the value was truncated to an integer and byte-swapped
    Legacy,
}
impl FloatMode {
    /// Decodes four on-disk bytes into a float
    #[must_use]
    pub fn decode(self, bytes: [u8; 4]) -> f32 {
        match self {
            Self::Current => f32::from_be_bytes(bytes),
            #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
            Self::Legacy => {
                let raw = f32::from_bits(u32::from_le_bytes(bytes));
                (raw as u32).swap_bytes() as f32
            }
        }
    }

    /// Encodes a float into its four on-disk bytes
    ///
    /// Only integral values survive the legacy path.
    #[must_use]
    pub fn encode(self, value: f32) -> [u8; 4] {
        match self {
            Self::Current => value.to_be_bytes(),
            #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
            Self::Legacy => {
                let swapped = (value as u32).swap_bytes() as f32;
                swapped.to_bits().to_le_bytes()
            }
        }
    }
}

/// Converts an end-of-stream into a short read on the named field
fn short_read(field: &'static str, needed: usize) -> impl FnOnce(io::Error) -> Error {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ReadError::ShortRead { field, needed }.into()
        } else {
            e.into()
        }
    }
}

/// Big-endian field decoding over a byte stream
///
/// Every method takes the name of the field being decoded so that a short read can
/// report where the stream ran out.
pub trait TableRead: Read {
    fn read_uint32(&mut self, field: &'static str) -> Result<u32> {
        self.read_u32::<BigEndian>().map_err(short_read(field, 4))
    }
    fn read_int32(&mut self, field: &'static str) -> Result<i32> {
        self.read_i32::<BigEndian>().map_err(short_read(field, 4))
    }
    fn read_uint16(&mut self, field: &'static str) -> Result<u16> {
        self.read_u16::<BigEndian>().map_err(short_read(field, 2))
    }
    fn read_int16(&mut self, field: &'static str) -> Result<i16> {
        self.read_i16::<BigEndian>().map_err(short_read(field, 2))
    }
    fn read_uint8(&mut self, field: &'static str) -> Result<u8> {
        ReadBytesExt::read_u8(self).map_err(short_read(field, 1))
    }
    fn read_int8(&mut self, field: &'static str) -> Result<i8> {
        ReadBytesExt::read_i8(self).map_err(short_read(field, 1))
    }

    /// Reads a float using the file's float mode
    fn read_float(&mut self, mode: FloatMode, field: &'static str) -> Result<f32> {
        let bytes = self.read_fixed::<4>(field)?;
        Ok(mode.decode(bytes))
    }

    /// Reads exactly `N` raw bytes
    fn read_fixed<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf).map_err(short_read(field, N))?;
        Ok(buf)
    }

    /// Reads a `uint32` length followed by that many bytes of text
    ///
    /// The payload is read through a bounded adapter so that a corrupt length cannot
    /// force a large allocation before the stream runs dry.
    fn read_string(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_uint32(field)? as usize;
        let mut buf = Vec::new();
        let n = (&mut *self).take(len as u64).read_to_end(&mut buf)?;
        if n < len {
            return Err(ReadError::ShortRead { field, needed: len }.into());
        }
        String::from_utf8(buf).map_err(|e| e.utf8_error().into())
    }
}
impl<R: Read> TableRead for R {}

/// Big-endian field encoding over a byte stream
pub trait TableWrite: Write {
    fn write_uint32(&mut self, value: u32) -> Result<()> {
        Ok(self.write_u32::<BigEndian>(value)?)
    }
    fn write_int32(&mut self, value: i32) -> Result<()> {
        Ok(self.write_i32::<BigEndian>(value)?)
    }
    fn write_uint16(&mut self, value: u16) -> Result<()> {
        Ok(self.write_u16::<BigEndian>(value)?)
    }
    fn write_int16(&mut self, value: i16) -> Result<()> {
        Ok(self.write_i16::<BigEndian>(value)?)
    }
    fn write_uint8(&mut self, value: u8) -> Result<()> {
        Ok(WriteBytesExt::write_u8(self, value)?)
    }
    fn write_int8(&mut self, value: i8) -> Result<()> {
        Ok(WriteBytesExt::write_i8(self, value)?)
    }
    fn write_float(&mut self, value: f32, mode: FloatMode) -> Result<()> {
        Ok(self.write_all(&mode.encode(value))?)
    }

    /// Writes a `uint32` length prefix followed by the raw bytes (no terminator)
    fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u32::try_from(value.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "string does not fit a 32-bit length prefix",
            )
        })?;
        self.write_uint32(len)?;
        Ok(self.write_all(value.as_bytes())?)
    }
}
impl<W: Write> TableWrite for W {}

/// Length of a string field on disk
#[must_use]
pub fn string_size(value: &str) -> usize {
    4 + value.len()
}

#[must_use]
pub fn int32_at(bytes: &[u8], offset: usize) -> i32 {
    BigEndian::read_i32(&bytes[offset..offset + 4])
}

#[must_use]
pub fn float_at(bytes: &[u8], offset: usize, mode: FloatMode) -> f32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    mode.decode(buf)
}
