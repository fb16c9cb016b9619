//! # BPMAP
//!
//! Binary probe map files list, for each named sequence, the probes that hit it:
//! array coordinates of the perfect-match (and optionally mismatch) cells, the packed
//! probe sequence, a match score, and the genomic position and strand.
//!
//! ## Layout
//!
//! ```text
//! header       magic "PHT7\r\n\x1a\n" | version f32 | sequence count u32
//! descriptions name | [pairing u32 | hit offset u32]   (version >= 3.0)
//!              hit count u32
//!              [group | version | param count | params] (version >= 2)
//! hits         per sequence: sequence id u32 | hit rows
//! ```
//!
//! Hit rows are 33 bytes with PM/MM coordinates and 25 bytes when PM-only. All
//! integers are big-endian.
//!
//! Probe maps are usually authored as text (TPMAP) and converted with
//! [`convert_tpmap`].

mod header;
mod hit;
mod reader;
mod sequence;
mod tpmap;
mod writer;

pub use header::{BpmapHeader, DEFAULT_VERSION, MAGIC, SIZE_HEADER};
pub use hit::{HitRow, PmMmHitBytes, PmOnlyHitBytes, ProbePairing, PM_MM_HIT_SIZE, PM_ONLY_HIT_SIZE};
pub use reader::BpmapFile;
pub use sequence::{HitIter, SequenceItem, SequenceView};
pub use tpmap::{convert_tpmap, tpmap_exists, Tpmap};
pub use writer::{BpmapWriter, BpmapWriterBuilder};
