//! # BAR
//!
//! Binary analysis result files hold a table of per-position results for each named
//! sequence. Every sequence shares the column types declared in the header.
//!
//! ## Layout
//!
//! ```text
//! header    magic "barr\r\n\x1a\n" | version f32 | sequence count i32
//!           column count i32 | column codes i32... | param count i32 | params
//! sequences name | [group] | version | [param count | params] | row count i32
//!           rows: one 4-byte cell per column
//! footer    "END\n"
//! ```
//!
//! Bracketed fields are only present in version 2 files. `Integer` cells are stored
//! as `int32` and all other cells as `float32`, whatever width the column declares.

mod column;
mod header;
mod reader;
mod sequence;
mod writer;

pub use column::{data_row_size, ColumnType, ResultValue, CELL_SIZE};
pub use header::{BarHeader, DEFAULT_VERSION, FOOTER, MAGIC};
pub use reader::BarFile;
pub use sequence::{ResultSequence, ResultSequenceView, RowIter};
pub use writer::{BarWriter, BarWriterBuilder};
