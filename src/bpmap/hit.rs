//! BPMAP hit rows
//!
//! A hit row has one of two fixed layouts depending on the probe pairing of its
//! sequence. Both layouts are described by byte-array [`Pod`] structs so that a row
//! can be viewed directly over file bytes and the same decode serves the copy and
//! mapped paths.

use std::cmp::Ordering;
use std::io::{Read, Write};

use bytemuck::{Pod, Zeroable};

use crate::codec::FloatMode;
use crate::error::{ReadError, Result};
use crate::nuc::{self, PackedProbe};

/// Bytes in a hit row carrying PM and MM coordinates
pub const PM_MM_HIT_SIZE: usize = std::mem::size_of::<PmMmHitBytes>();

/// Bytes in a hit row carrying only PM coordinates
pub const PM_ONLY_HIT_SIZE: usize = std::mem::size_of::<PmOnlyHitBytes>();

/// Probe pairing of every hit in a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePairing {
    /// Perfect-match and mismatch coordinates
    #[default]
    PmMm,
    /// Perfect-match coordinates only
    PmOnly,
}
impl ProbePairing {
    /// Decodes the on-disk pairing code (0 is PM/MM, anything else PM-only)
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        if code == 0 {
            Self::PmMm
        } else {
            Self::PmOnly
        }
    }

    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::PmMm => 0,
            Self::PmOnly => 1,
        }
    }

    /// On-disk width of a hit row
    #[must_use]
    pub fn row_size(self) -> usize {
        match self {
            Self::PmMm => PM_MM_HIT_SIZE,
            Self::PmOnly => PM_ONLY_HIT_SIZE,
        }
    }
}

/// Wire layout of a hit row with PM and MM coordinates
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct PmMmHitBytes {
    pm_x: [u8; 4],
    pm_y: [u8; 4],
    mm_x: [u8; 4],
    mm_y: [u8; 4],
    probe_length: u8,
    probe: PackedProbe,
    match_score: [u8; 4],
    position: [u8; 4],
    top_strand: u8,
}

/// Wire layout of a hit row with PM coordinates only
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct PmOnlyHitBytes {
    pm_x: [u8; 4],
    pm_y: [u8; 4],
    probe_length: u8,
    probe: PackedProbe,
    match_score: [u8; 4],
    position: [u8; 4],
    top_strand: u8,
}

/// A single probe hit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HitRow {
    pub pm_x: u32,
    pub pm_y: u32,
    /// Zero when the sequence is PM-only
    pub mm_x: u32,
    /// Zero when the sequence is PM-only
    pub mm_y: u32,
    /// Number of bases in the probe
    pub probe_length: u8,
    /// Probe as stored on disk
    pub packed_probe: PackedProbe,
    /// Decoded probe, empty when the probe was not requested
    pub probe: String,
    pub match_score: f32,
    /// Genomic position of the first base of the probe
    pub position: u32,
    pub top_strand: bool,
}
impl HitRow {
    /// Decodes a row from exactly `pairing.row_size()` bytes
    ///
    /// The probe string is only unpacked when `include_probe` is set.
    pub fn from_bytes(
        bytes: &[u8],
        pairing: ProbePairing,
        mode: FloatMode,
        include_probe: bool,
    ) -> Result<Self> {
        let mut row = match pairing {
            ProbePairing::PmMm => {
                let raw: &PmMmHitBytes = bytemuck::try_from_bytes(bytes).map_err(|_| {
                    ReadError::ShortRead {
                        field: "hit row",
                        needed: PM_MM_HIT_SIZE,
                    }
                })?;
                Self {
                    pm_x: u32::from_be_bytes(raw.pm_x),
                    pm_y: u32::from_be_bytes(raw.pm_y),
                    mm_x: u32::from_be_bytes(raw.mm_x),
                    mm_y: u32::from_be_bytes(raw.mm_y),
                    probe_length: raw.probe_length,
                    packed_probe: raw.probe,
                    probe: String::new(),
                    match_score: mode.decode(raw.match_score),
                    position: u32::from_be_bytes(raw.position),
                    top_strand: raw.top_strand != 0,
                }
            }
            ProbePairing::PmOnly => {
                let raw: &PmOnlyHitBytes = bytemuck::try_from_bytes(bytes).map_err(|_| {
                    ReadError::ShortRead {
                        field: "hit row",
                        needed: PM_ONLY_HIT_SIZE,
                    }
                })?;
                Self {
                    pm_x: u32::from_be_bytes(raw.pm_x),
                    pm_y: u32::from_be_bytes(raw.pm_y),
                    mm_x: 0,
                    mm_y: 0,
                    probe_length: raw.probe_length,
                    packed_probe: raw.probe,
                    probe: String::new(),
                    match_score: mode.decode(raw.match_score),
                    position: u32::from_be_bytes(raw.position),
                    top_strand: raw.top_strand != 0,
                }
            }
        };
        if include_probe {
            row.decode_probe()?;
        }
        Ok(row)
    }

    /// Reads one row from a stream, always unpacking the probe
    pub fn from_reader<R: Read>(
        reader: &mut R,
        pairing: ProbePairing,
        mode: FloatMode,
    ) -> Result<Self> {
        let mut buffer = [0u8; PM_MM_HIT_SIZE];
        let bytes = &mut buffer[..pairing.row_size()];
        reader.read_exact(bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ReadError::ShortRead {
                    field: "hit row",
                    needed: pairing.row_size(),
                }
                .into()
            } else {
                crate::Error::from(e)
            }
        })?;
        Self::from_bytes(bytes, pairing, mode, true)
    }

    /// Writes the row in the layout of `pairing`
    ///
    /// MM coordinates are dropped for PM-only sequences.
    pub fn write_bytes<W: Write>(
        &self,
        writer: &mut W,
        pairing: ProbePairing,
        mode: FloatMode,
    ) -> Result<()> {
        match pairing {
            ProbePairing::PmMm => {
                let raw = PmMmHitBytes {
                    pm_x: self.pm_x.to_be_bytes(),
                    pm_y: self.pm_y.to_be_bytes(),
                    mm_x: self.mm_x.to_be_bytes(),
                    mm_y: self.mm_y.to_be_bytes(),
                    probe_length: self.probe_length,
                    probe: self.packed_probe,
                    match_score: mode.encode(self.match_score),
                    position: self.position.to_be_bytes(),
                    top_strand: u8::from(self.top_strand),
                };
                writer.write_all(bytemuck::bytes_of(&raw))?;
            }
            ProbePairing::PmOnly => {
                let raw = PmOnlyHitBytes {
                    pm_x: self.pm_x.to_be_bytes(),
                    pm_y: self.pm_y.to_be_bytes(),
                    probe_length: self.probe_length,
                    probe: self.packed_probe,
                    match_score: mode.encode(self.match_score),
                    position: self.position.to_be_bytes(),
                    top_strand: u8::from(self.top_strand),
                };
                writer.write_all(bytemuck::bytes_of(&raw))?;
            }
        }
        Ok(())
    }

    /// Unpacks the stored probe into [`HitRow::probe`]
    ///
    /// On failure the probe string is left empty.
    pub fn decode_probe(&mut self) -> Result<()> {
        self.probe.clear();
        self.probe = nuc::unpack_string(&self.packed_probe, usize::from(self.probe_length))?;
        Ok(())
    }

    /// Genomic position of the first base of the probe
    #[must_use]
    pub fn start_position(&self) -> u32 {
        self.position
    }

    /// Genomic position of the center base of the probe
    ///
    /// Saturates at `u32::MAX` for probes hitting the very end of the coordinate range.
    #[must_use]
    pub fn center_position(&self) -> u32 {
        self.position
            .saturating_add(u32::from(self.probe_length.saturating_sub(1)) / 2)
    }

    /// Hit ordering used when sorting hits for output
    ///
    /// Orders by position, then strand, then PM X, PM Y, MM X and MM Y.
    #[must_use]
    pub fn precedes(&self, rhs: &Self) -> bool {
        let same_pos = self.position == rhs.position;
        let same_strand = same_pos && self.top_strand == rhs.top_strand;
        let same_pm_x = same_strand && self.pm_x == rhs.pm_x;
        let same_pm_y = same_pm_x && self.pm_y == rhs.pm_y;

        (same_pm_y && self.mm_x == rhs.mm_x && self.mm_y < rhs.mm_y)
            || (same_pm_y && self.mm_x < rhs.mm_x)
            || (same_pm_x && self.pm_y < rhs.pm_y)
            || (same_strand && self.pm_x < rhs.pm_x)
            || (same_pos && !self.top_strand && rhs.top_strand)
            || self.position < rhs.position
    }

    /// [`HitRow::precedes`] as a total [`Ordering`] for `sort_by`
    #[must_use]
    pub fn order(&self, rhs: &Self) -> Ordering {
        if self.precedes(rhs) {
            Ordering::Less
        } else if rhs.precedes(self) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

// Row widths are fixed by the format
const _: () = assert!(PM_MM_HIT_SIZE == 33);
const _: () = assert!(PM_ONLY_HIT_SIZE == 25);

#[cfg(test)]
mod testing {
    use super::*;
    use std::io::Cursor;

    fn hit(position: u32, top_strand: bool, pm_x: u32, pm_y: u32) -> HitRow {
        HitRow {
            pm_x,
            pm_y,
            mm_x: pm_x,
            mm_y: pm_y + 1,
            probe_length: 5,
            packed_probe: nuc::pack(b"GATTA").unwrap(),
            probe: "GATTA".to_string(),
            match_score: 0.75,
            position,
            top_strand,
        }
    }

    #[test]
    fn test_row_widths() {
        assert_eq!(ProbePairing::PmMm.row_size() - ProbePairing::PmOnly.row_size(), 8);
    }

    #[test]
    fn test_pairing_codes() {
        assert_eq!(ProbePairing::from_code(0), ProbePairing::PmMm);
        assert_eq!(ProbePairing::from_code(1), ProbePairing::PmOnly);
        assert_eq!(ProbePairing::from_code(7), ProbePairing::PmOnly);
        assert_eq!(ProbePairing::from_code(ProbePairing::PmOnly.code()), ProbePairing::PmOnly);
    }

    #[test]
    fn test_write_read_pm_mm() -> Result<()> {
        let row = hit(1200, true, 10, 20);
        let mut buf = Vec::new();
        row.write_bytes(&mut buf, ProbePairing::PmMm, FloatMode::Current)?;
        assert_eq!(buf.len(), PM_MM_HIT_SIZE);

        let decoded = HitRow::from_reader(&mut Cursor::new(buf), ProbePairing::PmMm, FloatMode::Current)?;
        assert_eq!(decoded, row);
        Ok(())
    }

    #[test]
    fn test_pm_only_drops_mm() -> Result<()> {
        let row = hit(5, false, 3, 4);
        let mut buf = Vec::new();
        row.write_bytes(&mut buf, ProbePairing::PmOnly, FloatMode::Current)?;
        assert_eq!(buf.len(), PM_ONLY_HIT_SIZE);

        let decoded = HitRow::from_bytes(&buf, ProbePairing::PmOnly, FloatMode::Current, false)?;
        assert_eq!((decoded.mm_x, decoded.mm_y), (0, 0));
        assert!(decoded.probe.is_empty());
        assert_eq!(decoded.packed_probe, row.packed_probe);
        assert_eq!(decoded.position, 5);
        Ok(())
    }

    #[test]
    fn test_wrong_width_rejected() {
        let buf = [0u8; PM_ONLY_HIT_SIZE];
        assert!(HitRow::from_bytes(&buf, ProbePairing::PmMm, FloatMode::Current, false).is_err());
    }

    #[test]
    fn test_oversized_probe_length() {
        let mut buf = vec![0u8; PM_ONLY_HIT_SIZE];
        buf[8] = 40;
        assert!(HitRow::from_bytes(&buf, ProbePairing::PmOnly, FloatMode::Current, true).is_err());
        assert!(HitRow::from_bytes(&buf, ProbePairing::PmOnly, FloatMode::Current, false).is_ok());
    }

    #[test]
    fn test_positions() {
        let row = hit(100, true, 0, 0);
        assert_eq!(row.start_position(), 100);
        assert_eq!(row.center_position(), 102);
    }

    #[test]
    fn test_center_position_at_coordinate_limit() {
        let row = HitRow {
            position: u32::MAX,
            probe_length: 25,
            ..HitRow::default()
        };
        assert_eq!(row.start_position(), u32::MAX);
        assert_eq!(row.center_position(), u32::MAX);

        let near = HitRow {
            position: u32::MAX - 20,
            probe_length: 25,
            ..HitRow::default()
        };
        assert_eq!(near.center_position(), u32::MAX - 8);
    }

    #[test]
    fn test_precedes() {
        let a = hit(10, false, 5, 5);
        assert!(a.precedes(&hit(11, false, 0, 0)));
        assert!(a.precedes(&hit(10, true, 0, 0)));
        assert!(a.precedes(&hit(10, false, 6, 0)));
        assert!(a.precedes(&hit(10, false, 5, 6)));
        assert!(!a.precedes(&a.clone()));
        assert!(!hit(11, false, 0, 0).precedes(&a));

        let mut b = a.clone();
        b.mm_y += 1;
        assert!(a.precedes(&b));
        assert!(!b.precedes(&a));
    }
}
