//! # tilebin
//!
//! Readers and writers for two binary formats used with tiling microarrays:
//!
//! * [`bpmap`] probe map files, mapping array cells to genomic positions, and their
//!   text form
//! * [`bar`] analysis result files, holding per-position results per sequence
//!
//! Both readers can either copy every row into memory or memory-map the file and
//! decode rows on access (see [`ReadOptions`]).
//!
//! ```no_run
//! # use tilebin::{BpmapFile, ReadOptions, Result};
//! # fn main() -> Result<()> {
//! let mut file = BpmapFile::with_options("array.bpmap", ReadOptions::mapped());
//! file.read()?;
//! for seq in file.sequences() {
//!     for hit in seq.hits(true) {
//!         let hit = hit?;
//!         println!("{}\t{}\t{}", seq.full_name(), hit.position, hit.probe);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod bar;
pub mod bpmap;
pub mod codec;
mod config;
mod error;
pub mod nuc;
mod params;
mod policy;
mod region;
mod store;

pub use bar::{
    BarFile, BarHeader, BarWriter, BarWriterBuilder, ColumnType, ResultSequence,
    ResultSequenceView, ResultValue,
};
pub use bpmap::{
    convert_tpmap, tpmap_exists, BpmapFile, BpmapHeader, BpmapWriter, BpmapWriterBuilder, HitRow,
    ProbePairing, SequenceItem, SequenceView, Tpmap,
};
pub use codec::FloatMode;
pub use config::{AccessMode, MapFallback, ReadOptions, RegionBackend};
pub use error::{Error, HeaderError, ReadError, Result, WriteError};
pub use params::{ParameterList, TagValue};
pub use policy::{Policy, ProbeEncoder};
pub use region::MappedRegion;
pub use store::{ByteSpan, RowStore, TableState};

/// Seed for the random base substitution of [`Policy::RandomDraw`]
pub const RNG_SEED: u64 = 42;
