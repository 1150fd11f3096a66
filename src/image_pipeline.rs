//! Frame sequence pipeline module
//!
//! This module turns per-frame camera readouts into pages of a multi-page TIFF,
//! with separate modules for the stream description, embedded metadata decoding,
//! ROI recomposition, page annotation and TIFF writing.

pub mod common;
pub mod stream;
pub mod metadata;
pub mod recompose;
pub mod description;
pub mod tiff;

pub use self::common::{
    DecodeError,
    GeometryError,
    SequenceError,
    Result,
};

pub use self::stream::{
    ExposureResolution,
    FrameRecord,
    Region,
    StreamHeader,
    StreamVersion,
};

pub use self::metadata::{
    DecodedFrame,
    FrameHeader,
    RoiEntry,
    RoiHeader,
};

pub use self::recompose::{
    copy_passthrough,
    recompose,
};

pub use self::description::format_image_description;

pub use self::tiff::{
    TiffCompression,
    WriterConfig,
    WriterConfigBuilder,
    SequenceWriter,
    TiffSequenceWriter,
};
