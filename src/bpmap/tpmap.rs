//! Text probe map (TPMAP) input
//!
//! A TPMAP is the whitespace-delimited text form of a BPMAP. Each sequence block opens
//! with tag lines and is followed by one line per hit:
//!
//! ```text
//! #seq_group_name Hs
//! #version        hg19
//! #chip           tiling-1.0
//! ACGTACGTAC  +  chr1  1000  12  40  [mmX mmY]  [score]
//! ```
//!
//! A change of sequence name in the hit lines starts a new sequence that inherits the
//! group, version and tags of the current block. Lines that are empty or whose first
//! token is a lone `#` are skipped.
//!
//! [`Tpmap::write_bpmap`] feeds a parsed map into a [`BpmapWriter`] and
//! [`convert_tpmap`] does the whole file-to-file conversion.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::header::DEFAULT_VERSION;
use super::hit::{HitRow, ProbePairing};
use super::sequence::SequenceItem;
use super::writer::{BpmapWriter, BpmapWriterBuilder};
use crate::error::{ReadError, Result};
use crate::nuc::MAX_PROBE_LENGTH;
use crate::store::RowStore;

const TAG_START: &str = "#";
const GROUP_TAG: &str = "#seq_group_name";
const VERSION_TAG: &str = "#version";

/// Fields that lead every hit line
const HIT_FIELDS: usize = 6;

/// Checks whether a text probe map is present at `path`
pub fn tpmap_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_file()
}

/// Parsed text probe map, sorted the way [`BpmapWriter`] sorts
#[derive(Debug, Clone, Default)]
pub struct Tpmap {
    sequences: Vec<SequenceItem>,
}
impl Tpmap {
    /// Reads and parses the map at `path`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|e| ReadError::UnableToOpen(path.to_path_buf(), e))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parses a map from any buffered reader
    ///
    /// Sequences come out ordered by group, version and name, and the hits of each
    /// sequence by [`HitRow::order`].
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidTpmapLine`] with the 1-based line number for tags
    /// out of order, malformed hit lines, or hits whose pairing differs from the
    /// first hit of their sequence.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut parser = Parser::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            parser
                .line(&line)
                .map_err(|reason| ReadError::InvalidTpmapLine {
                    line: index + 1,
                    reason,
                })?;
        }
        let mut sequences = parser.finish();
        sequences.sort_by(|a, b| {
            (&a.group_name, &a.seq_version, &a.name).cmp(&(&b.group_name, &b.seq_version, &b.name))
        });
        debug!(sequences = sequences.len(), "parsed tpmap");
        Ok(Self { sequences })
    }

    /// Sequences with their hits held as owned rows
    #[must_use]
    pub fn sequences(&self) -> &[SequenceItem] {
        &self.sequences
    }

    /// Hits of sequence `index`
    #[must_use]
    pub fn hits(&self, index: usize) -> &[HitRow] {
        self.sequences
            .get(index)
            .and_then(|item| item.hits.owned())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn num_hits(&self) -> usize {
        self.sequences.iter().map(|item| item.hits.len()).sum()
    }

    /// Adds every sequence and hit to `writer`, returning the number of hits kept
    ///
    /// Hits dropped by the writer's invalid-base policy are not counted.
    pub fn write_bpmap<W: Write>(self, writer: &mut BpmapWriter<W>) -> Result<usize> {
        let mut kept = 0;
        for mut item in self.sequences {
            let hits = std::mem::take(&mut item.hits);
            let seq = writer.add_sequence(item)?;
            if let RowStore::Owned(hits) = hits {
                for hit in hits {
                    if writer.add_hit(seq, hit)? {
                        kept += 1;
                    }
                }
            }
        }
        Ok(kept)
    }
}

/// Converts the text probe map at `tpmap` into a BPMAP at `bpmap`
///
/// The output is written as version 3.0 with sorted sequences and hits.
pub fn convert_tpmap<P: AsRef<Path>, Q: AsRef<Path>>(tpmap: P, bpmap: Q) -> Result<()> {
    let map = Tpmap::from_path(tpmap)?;
    let mut writer = BpmapWriterBuilder::default()
        .version(DEFAULT_VERSION)
        .sort(true)
        .build(BufWriter::new(File::create(bpmap.as_ref())?))?;
    let kept = map.write_bpmap(&mut writer)?;
    writer.finish()?;
    debug!(path = ?bpmap.as_ref(), hits = kept, "converted tpmap");
    Ok(())
}

/// Which lines may come next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Section {
    #[default]
    Start,
    Group,
    Version,
    Tags,
    Hits,
}

/// Sequence being filled by the current block
#[derive(Debug, Default)]
struct Pending {
    item: SequenceItem,
    hits: Vec<HitRow>,
    pairing: Option<ProbePairing>,
}
impl Pending {
    /// Next sequence of the same block, keeping its group, version and tags
    fn successor(&self, name: &str) -> Self {
        Self {
            item: SequenceItem::new(name)
                .group_name(self.item.group_name.clone())
                .seq_version(self.item.seq_version.clone())
                .parameters(self.item.parameters.clone()),
            ..Self::default()
        }
    }

    fn into_item(self) -> SequenceItem {
        let mut item = self.item;
        item.pairing = self.pairing.unwrap_or_default();
        item.num_hits = u32::try_from(self.hits.len()).unwrap_or(u32::MAX);
        item.hits = RowStore::Owned(self.hits);
        item
    }
}

#[derive(Debug, Default)]
struct Parser {
    section: Section,
    done: Vec<SequenceItem>,
    current: Option<Pending>,
}
impl Parser {
    fn line(&mut self, line: &str) -> std::result::Result<(), String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.first() {
            None | Some(&TAG_START) => Ok(()),
            Some(_) if line.starts_with(TAG_START) => self.tag(&tokens),
            Some(_) => self.hit(&tokens),
        }
    }

    fn tag(&mut self, tokens: &[&str]) -> std::result::Result<(), String> {
        let tag = tokens[0].to_ascii_lowercase();
        let value = tokens.get(1).copied().unwrap_or_default();
        match (tag.as_str(), self.section) {
            (GROUP_TAG, Section::Start | Section::Hits) => {
                self.flush();
                self.current = Some(Pending {
                    item: SequenceItem::new("").group_name(value),
                    ..Pending::default()
                });
                self.section = Section::Group;
            }
            (GROUP_TAG, _) => {
                return Err(format!(
                    "{GROUP_TAG} must open the file or follow a block of hits"
                ));
            }
            (VERSION_TAG, Section::Group) => {
                self.pending()?.item.seq_version = value.to_string();
                self.section = Section::Version;
            }
            (VERSION_TAG, _) => {
                return Err(format!("{VERSION_TAG} must follow {GROUP_TAG}"));
            }
            (_, Section::Version | Section::Tags) => {
                let name = &tag[TAG_START.len()..];
                self.pending()?.item.parameters.append(name, value);
                self.section = Section::Tags;
            }
            (_, _) => return Err(format!("tag {tag} must follow {VERSION_TAG}")),
        }
        Ok(())
    }

    fn hit(&mut self, tokens: &[&str]) -> std::result::Result<(), String> {
        let field_count = || {
            format!(
                "expected {} to {} fields in a hit line, found {}",
                HIT_FIELDS,
                HIT_FIELDS + 3,
                tokens.len()
            )
        };
        let [probe, strand, seq_name, position, pm_x, pm_y, extra @ ..] = tokens else {
            return Err(field_count());
        };
        let (mm, score) = match extra {
            [] => (None, None),
            [score] => (None, Some(*score)),
            [mm_x, mm_y] => (Some((*mm_x, *mm_y)), None),
            [mm_x, mm_y, score] => (Some((*mm_x, *mm_y)), Some(*score)),
            _ => return Err(field_count()),
        };
        let line_pairing = if mm.is_some() {
            ProbePairing::PmMm
        } else {
            ProbePairing::PmOnly
        };

        let Some(current) = self.current.as_mut() else {
            return Err(format!("hit line before any {GROUP_TAG}"));
        };
        if current.item.name.is_empty() {
            current.item.name = (*seq_name).to_string();
        } else if current.item.name != *seq_name {
            let next = current.successor(seq_name);
            self.flush();
            self.current = Some(next);
        }
        let current = self.pending()?;
        match current.pairing {
            None => current.pairing = Some(line_pairing),
            Some(ProbePairing::PmMm) if line_pairing == ProbePairing::PmOnly => {
                return Err("missing MM coordinates in a PM/MM sequence".to_string());
            }
            Some(ProbePairing::PmOnly) if line_pairing == ProbePairing::PmMm => {
                return Err("MM coordinates in a PM-only sequence".to_string());
            }
            Some(_) => {}
        }

        if probe.len() > MAX_PROBE_LENGTH {
            return Err(format!(
                "probe {probe} is longer than {MAX_PROBE_LENGTH} bases"
            ));
        }
        if !probe
            .bytes()
            .all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T'))
        {
            return Err(format!("failed to pack probe {probe}"));
        }

        let mut hit = HitRow {
            probe: probe.to_ascii_uppercase(),
            top_strand: parse_strand(strand)?,
            position: parse_u32(position, "hit position")?,
            pm_x: parse_u32(pm_x, "PM X")?,
            pm_y: parse_u32(pm_y, "PM Y")?,
            match_score: parse_score(score)?,
            ..HitRow::default()
        };
        if let Some((mm_x, mm_y)) = mm {
            hit.mm_x = parse_u32(mm_x, "MM X")?;
            hit.mm_y = parse_u32(mm_y, "MM Y")?;
        }
        current.hits.push(hit);
        self.section = Section::Hits;
        Ok(())
    }

    fn pending(&mut self) -> std::result::Result<&mut Pending, String> {
        self.current
            .as_mut()
            .ok_or_else(|| format!("tag line before any {GROUP_TAG}"))
    }

    fn flush(&mut self) {
        if let Some(pending) = self.current.take() {
            self.done.push(pending.into_item());
        }
    }

    fn finish(mut self) -> Vec<SequenceItem> {
        self.flush();
        for item in &mut self.done {
            if let RowStore::Owned(hits) = &mut item.hits {
                hits.sort_by(HitRow::order);
            }
        }
        self.done
    }
}

fn parse_strand(token: &str) -> std::result::Result<bool, String> {
    match token.as_bytes() {
        [b't' | b'T' | b'1' | b'+'] => Ok(true),
        [b'f' | b'F' | b'0' | b'-'] => Ok(false),
        _ => Err(format!("unrecognized strand {token}")),
    }
}

fn parse_u32(token: &str, field: &str) -> std::result::Result<u32, String> {
    token
        .parse()
        .map_err(|_| format!("unrecognized {field} {token}"))
}

/// Match score, 1.0 when the line carries none
fn parse_score(token: Option<&str>) -> std::result::Result<f32, String> {
    let Some(token) = token else {
        return Ok(1.0);
    };
    let score: f32 = token
        .parse()
        .map_err(|_| format!("unrecognized match score {token}"))?;
    if !(0.0..=1.0).contains(&score) {
        return Err(format!("match score {token} is outside 0.0 to 1.0"));
    }
    Ok(score)
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::bpmap::BpmapFile;
    use crate::config::ReadOptions;
    use std::io::Cursor;

    const MAP: &str = "\
# lone hash lines are comments
#seq_group_name Hs
#version hg19
#Chip tiling

ACGTACGTAC + chr1 300 4 10 4 11
acgtacgtac t chr1 100 2 10 2 11 0.5
GGGGACGTAC - chr1 100 3 10 3 11
TTTTACGTAC 1 chr2 50 8 8 8 9
#seq_group_name Mm
#version mm9
CCCCGGGG 0 chrX 7 1 1 0.25
CCCCAAAA F chrX 5 1 2
";

    fn parse(text: &str) -> Result<Tpmap> {
        Tpmap::from_reader(Cursor::new(text))
    }

    fn line_error(text: &str) -> Option<usize> {
        match parse(text) {
            Err(crate::Error::ReadError(ReadError::InvalidTpmapLine { line, .. })) => Some(line),
            _ => None,
        }
    }

    #[test]
    fn test_blocks_and_tags() -> Result<()> {
        let map = parse(MAP)?;
        let names: Vec<String> = map.sequences().iter().map(SequenceItem::full_name).collect();
        assert_eq!(names, vec!["Hs:hg19;chr1", "Hs:hg19;chr2", "Mm:mm9;chrX"]);

        let chr2 = &map.sequences()[1];
        assert_eq!(chr2.params().find("chip"), Some("tiling"));
        assert_eq!(chr2.probe_pairing(), ProbePairing::PmMm);
        assert_eq!(chr2.num_hits(), 1);
        assert!(map.sequences()[2].params().is_empty());
        assert_eq!(map.num_hits(), 6);
        Ok(())
    }

    #[test]
    fn test_hit_fields() -> Result<()> {
        let map = parse(MAP)?;

        // sorted by position, then bottom strand before top
        let chr1 = map.hits(0);
        let order: Vec<(u32, bool)> = chr1.iter().map(|h| (h.position, h.top_strand)).collect();
        assert_eq!(order, vec![(100, false), (100, true), (300, true)]);
        assert_eq!(chr1[1].probe, "ACGTACGTAC");
        assert_eq!(chr1[1].match_score, 0.5);
        assert_eq!((chr1[1].mm_x, chr1[1].mm_y), (2, 11));
        assert_eq!(chr1[0].match_score, 1.0);

        let chrx = &map.sequences()[2];
        assert_eq!(chrx.probe_pairing(), ProbePairing::PmOnly);
        let hits = map.hits(2);
        assert_eq!(hits[0].position, 5);
        assert_eq!(hits[1].match_score, 0.25);
        assert_eq!((hits[1].mm_x, hits[1].mm_y), (0, 0));
        Ok(())
    }

    #[test]
    fn test_hits_right_after_group() -> Result<()> {
        let map = parse("#seq_group_name Hs\nACGT + chr1 1 2 3\n")?;
        assert_eq!(map.sequences()[0].version(), "");
        assert_eq!(map.sequences()[0].full_name(), "chr1");
        Ok(())
    }

    #[test]
    fn test_tag_order() {
        assert_eq!(line_error("ACGT + chr1 1 2 3\n"), Some(1));
        assert_eq!(line_error("#version hg19\n"), Some(1));
        assert_eq!(line_error("#seq_group_name Hs\n#chip x\n"), Some(2));
        assert_eq!(
            line_error("#seq_group_name Hs\n#version v\n#seq_group_name Mm\n"),
            Some(3)
        );
        assert_eq!(
            line_error("#seq_group_name Hs\n#version v\nACGT + c 1 2 3\n#version w\n"),
            Some(4)
        );
        assert_eq!(
            line_error("#seq_group_name Hs\n#version v\nACGT + c 1 2 3\n#chip x\n"),
            Some(4)
        );
    }

    #[test]
    fn test_bad_hit_lines() {
        let head = "#seq_group_name Hs\n#version v\n";
        for hit in [
            "ACGT + chr1 1 2",
            "ACGT + chr1 1 2 3 4 5 6 7",
            "ACGT ++ chr1 1 2 3",
            "ACGT x chr1 1 2 3",
            "ACGT + chr1 -1 2 3",
            "ACGT + chr1 1 2 y",
            "ACGN + chr1 1 2 3",
            "ACGT + chr1 1 2 3 1.5",
            "ACGT + chr1 1 2 3 -0.1",
            "ACGT + chr1 1 2 3 4 5 score",
            "ACGTACGTACGTACGTACGTACGTACGTA + chr1 1 2 3",
        ] {
            assert_eq!(line_error(&format!("{head}{hit}\n")), Some(3), "{hit}");
        }
    }

    #[test]
    fn test_mixed_pairing() {
        let head = "#seq_group_name Hs\n#version v\n";
        assert_eq!(
            line_error(&format!("{head}ACGT + c 1 2 3 4 5\nACGT + c 2 2 3\n")),
            Some(4)
        );
        assert_eq!(
            line_error(&format!("{head}ACGT + c 1 2 3 0.5\nACGT + c 2 2 3 4 5\n")),
            Some(4)
        );
        // a new sequence name resets the pairing
        assert_eq!(
            line_error(&format!("{head}ACGT + c 1 2 3 4 5\nACGT + d 2 2 3\n")),
            None
        );
    }

    #[test]
    fn test_convert() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let tpmap = dir.path().join("array.tpmap");
        let bpmap = dir.path().join("array.bpmap");
        assert!(!tpmap_exists(&tpmap));
        std::fs::write(&tpmap, MAP)?;
        assert!(tpmap_exists(&tpmap));

        convert_tpmap(&tpmap, &bpmap)?;

        let expected = parse(MAP)?;
        let mut file = BpmapFile::with_options(&bpmap, ReadOptions::mapped());
        file.read()?;
        assert_eq!(file.header().version, 3.0);
        assert_eq!(file.num_sequences(), 3);
        for (index, view) in file.sequences().enumerate() {
            let item = &expected.sequences()[index];
            assert_eq!(view.full_name(), item.full_name());
            assert_eq!(view.probe_pairing(), item.probe_pairing());
            assert_eq!(view.parameters(), item.params());
            for (hit, want) in view.hits(true).zip(expected.hits(index)) {
                let hit = hit?;
                assert_eq!(hit.probe, want.probe);
                assert_eq!(hit.probe_length as usize, want.probe.len());
                assert_eq!(
                    (hit.position, hit.top_strand, hit.pm_x, hit.pm_y),
                    (want.position, want.top_strand, want.pm_x, want.pm_y)
                );
                assert_eq!((hit.mm_x, hit.mm_y), (want.mm_x, want.mm_y));
                assert_eq!(hit.match_score, want.match_score);
            }
        }
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = Tpmap::from_path("no/such/map.tpmap");
        assert!(matches!(
            result,
            Err(crate::Error::ReadError(ReadError::UnableToOpen(..)))
        ));
    }
}
