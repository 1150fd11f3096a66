//! TIFF writing module
//!
//! This module writes frame sequences as multi-page TIFF files, one page per
//! frame, and repairs page totals when a sequence ends early.

mod writer;
mod sequence_writer;
mod repair;
pub mod types;


pub use writer::SequenceWriter;
pub use sequence_writer::TiffSequenceWriter;
pub use repair::patch_page_totals;
pub use types::{TiffCompression, WriterConfig, WriterConfigBuilder};
