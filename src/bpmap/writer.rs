//! BPMAP writer
//!
//! Sequences and hits are collected in memory because every sequence description
//! stores the offset of its hit section, which is only known once all descriptions
//! are sized. [`BpmapWriter::finish`] lays out and writes the complete file.

use std::io::Write;

use tracing::debug;

use super::header::{BpmapHeader, DEFAULT_VERSION, SIZE_HEADER};
use super::hit::{HitRow, ProbePairing};
use super::sequence::SequenceItem;
use crate::codec::{string_size, FloatMode, TableWrite};
use crate::error::{Result, WriteError};
use crate::policy::{Policy, ProbeEncoder};

/// Builder for [`BpmapWriter`]
///
/// # Example
///
/// ```
/// # use tilebin::{BpmapWriterBuilder, Policy, Result};
/// # fn main() -> Result<()> {
/// let writer = BpmapWriterBuilder::default()
///     .version(3.0)
///     .policy(Policy::SetToA)
///     .sort(true)
///     .build(Vec::new())?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct BpmapWriterBuilder {
    /// Format version, 3.0 when unset
    version: Option<f32>,
    /// Float encoding for the version and match scores
    float_mode: Option<FloatMode>,
    /// Policy for probes with invalid bases
    policy: Option<Policy>,
    /// Sort sequences and hits before writing
    sort: Option<bool>,
}
impl BpmapWriterBuilder {
    #[must_use]
    pub fn version(mut self, version: f32) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn float_mode(mut self, float_mode: FloatMode) -> Self {
        self.float_mode = Some(float_mode);
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn build<W: Write>(self, inner: W) -> Result<BpmapWriter<W>> {
        let mut header = BpmapHeader::new(self.version.unwrap_or(DEFAULT_VERSION), 0);
        header.float_mode = self.float_mode.unwrap_or_default();
        Ok(BpmapWriter::new(
            inner,
            header,
            self.policy.unwrap_or_default(),
            self.sort.unwrap_or(false),
        ))
    }
}

/// Writer for BPMAP files
pub struct BpmapWriter<W: Write> {
    inner: W,
    header: BpmapHeader,
    encoder: ProbeEncoder,
    sort: bool,
    sequences: Vec<SequenceItem>,
    hits: Vec<Vec<HitRow>>,
}
impl<W: Write> BpmapWriter<W> {
    /// Creates a writer; nothing is written until [`BpmapWriter::finish`]
    ///
    /// The sequence count of `header` is ignored and set from the added sequences.
    pub fn new(inner: W, header: BpmapHeader, policy: Policy, sort: bool) -> Self {
        Self {
            inner,
            header,
            encoder: ProbeEncoder::new(policy),
            sort,
            sequences: Vec::new(),
            hits: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(&self) -> &BpmapHeader {
        &self.header
    }

    #[must_use]
    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Adds a sequence description and returns its index
    ///
    /// Any hits carried by `item` are discarded; hits are added with
    /// [`BpmapWriter::add_hit`].
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence is PM-only and the format version predates
    /// pairing codes.
    pub fn add_sequence(&mut self, mut item: SequenceItem) -> Result<usize> {
        if item.pairing == ProbePairing::PmOnly && !self.header.has_pairing() {
            return Err(WriteError::PairingRequiresVersion3(self.header.version).into());
        }
        item.hits = crate::store::RowStore::default();
        item.num_hits = 0;
        self.sequences.push(item);
        self.hits.push(Vec::new());
        Ok(self.sequences.len() - 1)
    }

    /// Adds a hit to sequence `seq`, packing its probe
    ///
    /// The probe is taken from [`HitRow::probe`] and `probe_length` is set from it.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the hit was added
    /// * `Ok(false)` if the policy dropped the hit for invalid bases
    pub fn add_hit(&mut self, seq: usize, mut hit: HitRow) -> Result<bool> {
        let Some(pairing) = self.sequences.get(seq).map(|item| item.pairing) else {
            return Err(WriteError::UnknownSequence(seq).into());
        };
        let Some(packed) = self.encoder.encode(hit.probe.as_bytes())? else {
            return Ok(false);
        };
        hit.packed_probe = packed;
        hit.probe_length = hit.probe.len() as u8;
        if pairing == ProbePairing::PmOnly {
            hit.mm_x = 0;
            hit.mm_y = 0;
        }
        self.hits[seq].push(hit);
        Ok(true)
    }

    /// On-disk size of a sequence description under this writer's version
    fn description_size(&self, item: &SequenceItem) -> usize {
        let mut size = string_size(&item.name) + 4;
        if self.header.has_pairing() {
            size += 8;
        }
        if self.header.has_group_metadata() {
            size += string_size(&item.group_name)
                + string_size(&item.seq_version)
                + 4
                + item.parameters.encoded_size();
        }
        size
    }

    fn sort_contents(&mut self) {
        let mut order: Vec<usize> = (0..self.sequences.len()).collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (&self.sequences[a], &self.sequences[b]);
            (&a.group_name, &a.seq_version, &a.name).cmp(&(&b.group_name, &b.seq_version, &b.name))
        });

        let mut sequences = std::mem::take(&mut self.sequences);
        let mut hits = std::mem::take(&mut self.hits);
        for &index in &order {
            self.sequences.push(std::mem::take(&mut sequences[index]));
            self.hits.push(std::mem::take(&mut hits[index]));
        }

        for rows in &mut self.hits {
            rows.sort_by(HitRow::order);
        }
    }

    /// Lays out and writes the whole file, returning the underlying writer
    pub fn finish(mut self) -> Result<W> {
        if self.sort {
            self.sort_contents();
        }
        self.header.num_sequences = narrow(self.sequences.len(), "sequence count")?;

        // each hit section starts with the sequence id
        let mut offset = SIZE_HEADER
            + self
                .sequences
                .iter()
                .map(|item| self.description_size(item))
                .sum::<usize>();
        let mut hit_starts = Vec::with_capacity(self.sequences.len());
        for (item, rows) in self.sequences.iter().zip(&self.hits) {
            hit_starts.push(narrow(offset, "hit offset")?);
            offset += 4 + rows.len() * item.pairing.row_size();
        }

        self.header.write_bytes(&mut self.inner)?;
        for ((item, rows), start) in self.sequences.iter().zip(&self.hits).zip(&hit_starts) {
            self.inner.write_string(&item.name)?;
            if self.header.has_pairing() {
                self.inner.write_uint32(item.pairing.code())?;
                self.inner.write_uint32(*start)?;
            }
            self.inner.write_uint32(narrow(rows.len(), "hit count")?)?;
            if self.header.has_group_metadata() {
                self.inner.write_string(&item.group_name)?;
                self.inner.write_string(&item.seq_version)?;
                self.inner
                    .write_uint32(narrow(item.parameters.len(), "parameter count")?)?;
                item.parameters.write_entries(&mut self.inner)?;
            }
        }
        for (index, (item, rows)) in self.sequences.iter().zip(&self.hits).enumerate() {
            self.inner.write_uint32(narrow(index, "sequence number")?)?;
            for hit in rows {
                hit.write_bytes(&mut self.inner, item.pairing, self.header.float_mode)?;
            }
        }
        self.inner.flush()?;
        debug!(
            sequences = self.sequences.len(),
            bytes = offset,
            version = self.header.version,
            "wrote bpmap"
        );
        Ok(self.inner)
    }
}

/// Narrows a count or offset to the 32-bit fields the format stores
fn narrow(value: usize, field: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| WriteError::FieldOverflow { field, value }.into())
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::codec::TableRead;
    use crate::params::ParameterList;
    use std::io::Cursor;

    fn probe_hit(position: u32, probe: &str) -> HitRow {
        HitRow {
            pm_x: position % 7,
            pm_y: position % 11,
            probe: probe.to_string(),
            match_score: 0.5,
            position,
            ..HitRow::default()
        }
    }

    #[test]
    fn test_layout_offsets() -> Result<()> {
        let mut writer = BpmapWriterBuilder::default().build(Vec::new())?;
        let mut params = ParameterList::new();
        params.append("k", "v");
        let a = writer.add_sequence(SequenceItem::new("a").parameters(params))?;
        let b = writer.add_sequence(SequenceItem::new("bb").pairing(ProbePairing::PmOnly))?;
        writer.add_hit(a, probe_hit(1, "ACGT"))?;
        writer.add_hit(b, probe_hit(2, "TTT"))?;
        writer.add_hit(b, probe_hit(3, "GG"))?;
        let bytes = writer.finish()?;

        let desc_a = 5 + 4 + 8 + 4 + 4 + 4 + (5 + 5);
        let desc_b = 6 + 4 + 8 + 4 + 4 + 4;
        let start_a = SIZE_HEADER + desc_a + desc_b;
        let start_b = start_a + 4 + ProbePairing::PmMm.row_size();
        assert_eq!(bytes.len(), start_b + 4 + 2 * ProbePairing::PmOnly.row_size());

        // stored hit offset of the second sequence
        let mut rdr = Cursor::new(&bytes[SIZE_HEADER + desc_a..]);
        assert_eq!(rdr.read_string("name")?, "bb");
        assert_eq!(rdr.read_uint32("pairing")?, 1);
        assert_eq!(rdr.read_uint32("start")? as usize, start_b);

        // sequence id written at the hit offset
        let mut rdr = Cursor::new(&bytes[start_b..]);
        assert_eq!(rdr.read_uint32("number")?, 1);
        Ok(())
    }

    #[test]
    fn test_pm_only_requires_version_3() -> Result<()> {
        let mut writer = BpmapWriterBuilder::default().version(2.0).build(Vec::new())?;
        assert!(writer
            .add_sequence(SequenceItem::new("x").pairing(ProbePairing::PmOnly))
            .is_err());
        assert!(writer.add_sequence(SequenceItem::new("x")).is_ok());
        Ok(())
    }

    #[test]
    fn test_policy_applies() -> Result<()> {
        let mut writer = BpmapWriterBuilder::default()
            .policy(Policy::IgnoreSequence)
            .build(Vec::new())?;
        let seq = writer.add_sequence(SequenceItem::new("chr"))?;
        assert!(writer.add_hit(seq, probe_hit(1, "ACGT"))?);
        assert!(!writer.add_hit(seq, probe_hit(2, "ANGT"))?);
        assert!(writer.add_hit(7, probe_hit(3, "A")).is_err());
        Ok(())
    }

    #[test]
    fn test_sorting() -> Result<()> {
        let mut writer = BpmapWriterBuilder::default().sort(true).build(Vec::new())?;
        let z = writer.add_sequence(SequenceItem::new("z").group_name("A"))?;
        let a = writer.add_sequence(SequenceItem::new("a").group_name("B"))?;
        writer.add_hit(z, probe_hit(30, "AC"))?;
        writer.add_hit(z, probe_hit(10, "AC"))?;
        writer.add_hit(z, probe_hit(20, "AC"))?;
        writer.add_hit(a, probe_hit(5, "AC"))?;
        writer.sort_contents();

        assert_eq!(writer.sequences[0].name, "z");
        assert_eq!(writer.sequences[1].name, "a");
        let positions: Vec<u32> = writer.hits[0].iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![10, 20, 30]);
        Ok(())
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_offsets_past_32_bits() {
        let limit = u32::MAX as usize;
        assert_eq!(narrow(limit, "hit offset").unwrap(), u32::MAX);
        assert!(matches!(
            narrow(limit + 1, "hit offset"),
            Err(crate::Error::WriteError(WriteError::FieldOverflow {
                field: "hit offset",
                ..
            }))
        ));
    }
}
