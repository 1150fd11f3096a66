//! Stream description module
//!
//! This module holds the sequence-wide header and the optional per-frame record
//! supplied by the acquisition layer.

pub mod types;

pub use types::{ExposureResolution, FrameRecord, Region, StreamHeader, StreamVersion};
