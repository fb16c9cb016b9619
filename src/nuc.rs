//! Packed probe sequences
//!
//! BPMAP probes are stored 2 bits per base in a fixed 7-byte blob. The first base
//! occupies the two most significant bits of the first byte and unused trailing bits
//! are zero. Base codes follow `bitnuc` (A=0, C=1, G=2, T=3), so the heavy lifting
//! is delegated to it and this module only reorders the bit pairs.

use crate::error::{ReadError, Result, WriteError};

/// Bytes reserved for a packed probe on disk
pub const PROBE_BYTES: usize = 7;

/// Maximum number of bases a packed probe can hold
pub const MAX_PROBE_LENGTH: usize = PROBE_BYTES * 4;

/// A probe blob exactly as stored on disk
pub type PackedProbe = [u8; PROBE_BYTES];

/// Packs an ASCII nucleotide sequence into a probe blob
///
/// # Errors
///
/// Returns an error if the sequence is longer than [`MAX_PROBE_LENGTH`] or contains a
/// byte outside `ACGT`.
pub fn pack(sequence: &[u8]) -> Result<PackedProbe> {
    if sequence.len() > MAX_PROBE_LENGTH {
        return Err(WriteError::ProbeTooLong {
            length: sequence.len(),
            capacity: MAX_PROBE_LENGTH,
        }
        .into());
    }
    let bits = bitnuc::as_2bit(sequence).map_err(|_| {
        WriteError::InvalidNucleotideSequence(String::from_utf8_lossy(sequence).into_owned())
    })?;

    let mut packed = [0u8; PROBE_BYTES];
    for i in 0..sequence.len() {
        let code = ((bits >> (2 * i)) & 0b11) as u8;
        packed[i / 4] |= code << (6 - 2 * (i % 4));
    }
    Ok(packed)
}

/// Unpacks the first `length` bases of a probe blob into `buffer`
///
/// The buffer is cleared first. On failure it is left empty.
///
/// # Errors
///
/// Returns an error if `length` exceeds [`MAX_PROBE_LENGTH`].
pub fn unpack(packed: &PackedProbe, length: usize, buffer: &mut Vec<u8>) -> Result<()> {
    buffer.clear();
    if length > MAX_PROBE_LENGTH {
        return Err(ReadError::ProbeTooLong {
            length,
            capacity: MAX_PROBE_LENGTH,
        }
        .into());
    }

    let mut bits = 0u64;
    for i in 0..length {
        let code = (packed[i / 4] >> (6 - 2 * (i % 4))) & 0b11;
        bits |= u64::from(code) << (2 * i);
    }
    if bitnuc::from_2bit(bits, length, buffer).is_err() {
        buffer.clear();
        return Err(ReadError::ProbeTooLong {
            length,
            capacity: MAX_PROBE_LENGTH,
        }
        .into());
    }
    Ok(())
}

/// Unpacks a probe blob into an owned string
pub fn unpack_string(packed: &PackedProbe, length: usize) -> Result<String> {
    let mut buffer = Vec::with_capacity(length);
    unpack(packed, length, &mut buffer)?;
    // bitnuc only emits ACGT
    Ok(buffer.into_iter().map(char::from).collect())
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_pack_bit_order() -> Result<()> {
        let packed = pack(b"ACGT")?;
        assert_eq!(packed[0], 0b0001_1011);
        assert_eq!(&packed[1..], &[0; 6]);

        let packed = pack(b"TA")?;
        assert_eq!(packed[0], 0b1100_0000);
        Ok(())
    }

    #[test]
    fn test_full_capacity() -> Result<()> {
        let probe = b"ACGTTGCAACGTTGCAACGTTGCAACGT";
        assert_eq!(probe.len(), MAX_PROBE_LENGTH);
        let packed = pack(probe)?;
        assert_eq!(unpack_string(&packed, probe.len())?.as_bytes(), probe);
        Ok(())
    }

    #[test]
    fn test_pack_rejects_invalid() {
        assert!(pack(b"ACNT").is_err());
        assert!(pack(&[b'A'; MAX_PROBE_LENGTH + 1]).is_err());
    }

    #[test]
    fn test_unpack_too_long_discards_output() {
        let packed = [0xFF; PROBE_BYTES];
        let mut buffer = b"stale".to_vec();
        assert!(unpack(&packed, MAX_PROBE_LENGTH + 1, &mut buffer).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_unpack_prefix() -> Result<()> {
        let packed = pack(b"GATTACA")?;
        assert_eq!(unpack_string(&packed, 4)?, "GATT");
        assert_eq!(unpack_string(&packed, 0)?, "");
        Ok(())
    }
}
