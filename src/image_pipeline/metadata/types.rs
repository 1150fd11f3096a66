//! Decoded frame metadata types

use std::ops::Range;

use crate::image_pipeline::stream::types::Region;

/// Signature opening every metadata-enabled frame buffer.
pub const FRAME_SIGNATURE: u32 = 5_328_208;

/// Packed size of the frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 48;

/// Packed size of a ROI header in bytes.
pub const ROI_HEADER_SIZE: usize = 32;

/// Frame header flag: ROI headers carry begin/end-of-region timestamps.
pub const FRAME_FLAG_ROI_TS_SUPPORTED: u8 = 0x01;

/// ROI flag: the ROI carries no usable data and is not painted.
pub const ROI_FLAG_INVALID: u8 = 0x01;

/// ROI flag: only the header was transferred, no pixel payload follows.
pub const ROI_FLAG_HEADER_ONLY: u8 = 0x02;

/// Frame-level header decoded from the start of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub version: u8,
    pub frame_nr: u32,
    pub roi_count: u16,
    /// Beginning-of-frame timestamp, in units of `timestamp_res_ns`
    pub timestamp_bof: u32,
    /// End-of-frame timestamp, in units of `timestamp_res_ns`
    pub timestamp_eof: u32,
    pub timestamp_res_ns: u32,
    pub exposure_time: u32,
    pub exposure_time_res_ns: u32,
    pub roi_timestamp_res_ns: u32,
    pub bit_depth: u8,
    pub color_mask: u8,
    pub flags: u8,
    pub extended_md_size: u16,
}

impl FrameHeader {
    pub fn roi_timestamps_supported(&self) -> bool {
        self.flags & FRAME_FLAG_ROI_TS_SUPPORTED != 0
    }
}

/// Begin/end-of-region timestamps, in units of the frame's `roi_timestamp_res_ns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoiTimestamps {
    pub bor: u32,
    pub eor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoiHeader {
    pub roi_nr: u16,
    /// Present only when the frame header advertises ROI timestamps.
    pub timestamps: Option<RoiTimestamps>,
    pub roi: Region,
    pub flags: u8,
    pub extended_md_size: u16,
}

impl RoiHeader {
    pub fn is_invalid(&self) -> bool {
        self.flags & ROI_FLAG_INVALID != 0
    }

    /// Whether a pixel payload follows this header in the buffer.
    pub fn carries_pixels(&self) -> bool {
        self.flags & (ROI_FLAG_INVALID | ROI_FLAG_HEADER_ONLY) == 0
    }
}

/// One decoded ROI. The payload and extended metadata are byte ranges into the
/// raw buffer the frame was decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoiEntry {
    pub header: RoiHeader,
    pub data: Range<usize>,
    pub ext_md: Range<usize>,
}

impl RoiEntry {
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn ext_md_size(&self) -> usize {
        self.ext_md.len()
    }

    /// Pixel payload within `raw`, which must be the buffer this entry was decoded from.
    pub fn payload<'a>(&self, raw: &'a [u8]) -> Option<&'a [u8]> {
        raw.get(self.data.clone())
    }
}

/// Decoded view of one metadata-enabled frame.
///
/// A writer keeps one of these for its whole life and decodes every frame into
/// it, so the ROI vector is only reallocated when a frame has more ROIs than any
/// frame before it.
#[derive(Debug, Clone, Default)]
pub struct DecodedFrame {
    pub(crate) header: FrameHeader,
    pub(crate) ext_md: Range<usize>,
    pub(crate) implied_roi: Region,
    pub(crate) roi_capacity: usize,
    pub(crate) rois: Vec<RoiEntry>,
}

impl DecodedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roi_capacity(capacity: usize) -> Self {
        Self {
            roi_capacity: capacity,
            rois: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Bounding region of all valid ROIs, before binning.
    pub fn implied_roi(&self) -> &Region {
        &self.implied_roi
    }

    pub fn ext_md_size(&self) -> usize {
        self.ext_md.len()
    }

    /// Number of ROI slots reserved so far; never shrinks.
    pub fn roi_capacity(&self) -> usize {
        self.roi_capacity
    }

    /// Number of ROIs in the last decoded frame, invalid ones included.
    pub fn roi_count(&self) -> usize {
        self.rois.len()
    }

    pub fn rois(&self) -> &[RoiEntry] {
        &self.rois
    }

    /// ROIs that are painted and described, with their original index.
    pub fn valid_rois(&self) -> impl Iterator<Item = (usize, &RoiEntry)> {
        self.rois
            .iter()
            .enumerate()
            .filter(|(_, roi)| !roi.header.is_invalid())
    }
}
