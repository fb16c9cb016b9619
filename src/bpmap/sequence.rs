use crate::error::{ReadError, Result};
use crate::params::ParameterList;
use crate::store::RowStore;

use super::hit::{HitRow, ProbePairing};
use super::reader::BpmapFile;

/// Description and hits of one BPMAP sequence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceItem {
    pub(crate) name: String,
    pub(crate) group_name: String,
    pub(crate) seq_version: String,
    pub(crate) pairing: ProbePairing,
    pub(crate) number: u32,
    pub(crate) num_hits: u32,
    pub(crate) hit_start_position: u32,
    pub(crate) parameters: ParameterList,
    pub(crate) hits: RowStore<HitRow>,
}
impl SequenceItem {
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
    pub fn seq_version(mut self, seq_version: impl Into<String>) -> Self {
        self.seq_version = seq_version.into();
        self
    }
    #[must_use]
    pub fn pairing(mut self, pairing: ProbePairing) -> Self {
        self.pairing = pairing;
        self
    }
    #[must_use]
    pub fn parameters(mut self, parameters: ParameterList) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn group(&self) -> &str {
        &self.group_name
    }
    pub fn version(&self) -> &str {
        &self.seq_version
    }
    pub fn probe_pairing(&self) -> ProbePairing {
        self.pairing
    }
    pub fn params(&self) -> &ParameterList {
        &self.parameters
    }

    /// Sequence id stored ahead of the hit rows
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn num_hits(&self) -> usize {
        self.num_hits as usize
    }

    /// Hit offset as recorded for the sequence
    ///
    /// For files newer than 3.0 this is the stored offset of the sequence id. For
    /// older files it is the offset of the first hit row.
    pub fn hit_start_position(&self) -> u32 {
        self.hit_start_position
    }

    /// `group:version;name`, or just the name when there is no version
    pub fn full_name(&self) -> String {
        if self.seq_version.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{};{}", self.group_name, self.seq_version, self.name)
        }
    }
}

/// Non-owning handle to a sequence of an open [`BpmapFile`]
///
/// The borrow ties the view to the file, so closing or re-reading the file ends it.
#[derive(Debug, Clone, Copy)]
pub struct SequenceView<'a> {
    file: &'a BpmapFile,
    index: usize,
}
impl<'a> SequenceView<'a> {
    pub(crate) fn new(file: &'a BpmapFile, index: usize) -> Self {
        Self { file, index }
    }

    fn item(&self) -> &'a SequenceItem {
        &self.file.items()[self.index]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The underlying sequence description
    #[must_use]
    pub fn sequence(&self) -> &'a SequenceItem {
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
    pub fn seq_version(&self) -> &'a str {
        &self.item().seq_version
    }
    #[must_use]
    pub fn full_name(&self) -> String {
        self.item().full_name()
    }
    #[must_use]
    pub fn probe_pairing(&self) -> ProbePairing {
        self.item().pairing
    }
    #[must_use]
    pub fn number(&self) -> u32 {
        self.item().number
    }
    #[must_use]
    pub fn parameters(&self) -> &'a ParameterList {
        &self.item().parameters
    }
    #[must_use]
    pub fn num_hits(&self) -> usize {
        self.item().hits.len()
    }

    /// Returns hit `index`
    ///
    /// Copy-mode hits are returned as read. Mapped hits are decoded from the file
    /// bytes and the probe is unpacked only when `include_probe` is set.
    pub fn hit(&self, index: usize, include_probe: bool) -> Result<HitRow> {
        let item = self.item();
        match &item.hits {
            RowStore::Owned(hits) => hits.get(index).cloned().ok_or_else(|| {
                ReadError::OutOfRange {
                    requested_index: index,
                    max_index: hits.len(),
                }
                .into()
            }),
            RowStore::Mapped(span) => {
                let region = self.file.region().ok_or(ReadError::DataNotRead)?;
                let bytes = span.row(region, index)?;
                HitRow::from_bytes(bytes, item.pairing, self.file.float_mode(), include_probe)
            }
        }
    }

    /// Absolute file offset of hit `index`, when the hits are mapped
    #[must_use]
    pub fn hit_offset(&self, index: usize) -> Option<usize> {
        self.item()
            .hits
            .span()
            .filter(|span| index < span.rows)
            .map(|span| span.row_offset(index))
    }

    /// Iterates over every hit of the sequence
    #[must_use]
    pub fn hits(&self, include_probe: bool) -> HitIter<'a> {
        HitIter {
            view: *self,
            include_probe,
            pos: 0,
        }
    }
}

/// Iterator over the hits of a [`SequenceView`]
pub struct HitIter<'a> {
    view: SequenceView<'a>,
    include_probe: bool,
    pos: usize,
}
impl Iterator for HitIter<'_> {
    type Item = Result<HitRow>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.view.num_hits() {
            return None;
        }
        let hit = self.view.hit(self.pos, self.include_probe);
        self.pos += 1;
        Some(hit)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.num_hits().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}
impl ExactSizeIterator for HitIter<'_> {}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_full_name() {
        let item = SequenceItem::new("chr1").group_name("Hs").seq_version("May2004");
        assert_eq!(item.full_name(), "Hs:May2004;chr1");

        let bare = SequenceItem::new("chr2").group_name("Hs");
        assert_eq!(bare.full_name(), "chr2");
    }

    #[test]
    fn test_builder_defaults() {
        let item = SequenceItem::new("chrX");
        assert_eq!(item.probe_pairing(), ProbePairing::PmMm);
        assert_eq!(item.num_hits(), 0);
        assert!(item.params().is_empty());
    }
}
