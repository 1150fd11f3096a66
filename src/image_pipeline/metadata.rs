//! Embedded frame metadata module
//!
//! Frames acquired with metadata enabled start with a packed frame header,
//! followed by one record per ROI (ROI header, extended metadata, pixels).
//! This module decodes that layout into a reusable [`DecodedFrame`].

pub mod types;
mod decoder;

#[cfg(test)]
pub(crate) mod fixtures;

pub use types::{
    DecodedFrame,
    FrameHeader,
    RoiEntry,
    RoiHeader,
    RoiTimestamps,
    FRAME_FLAG_ROI_TS_SUPPORTED,
    FRAME_HEADER_SIZE,
    FRAME_SIGNATURE,
    ROI_FLAG_HEADER_ONLY,
    ROI_FLAG_INVALID,
    ROI_HEADER_SIZE,
};
