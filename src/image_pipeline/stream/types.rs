//! Stream header and frame record types

use std::fmt;

use crate::image_pipeline::common::error::{Result, SequenceError};

/// Bytes per pixel sample in raw payloads and on the canvas.
pub const SAMPLE_BYTES: usize = 2;

/// Stream header flag: frames carry embedded ROI metadata.
pub const FLAG_HAS_METADATA: u8 = 0x01;

/// Ordinal stream format version. All version-dependent behavior is gated with
/// `>=` so newer versions keep every older field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StreamVersion(pub u16);

impl StreamVersion {
    pub const V1: Self = Self(1);
    pub const V2: Self = Self(2);
    pub const V3: Self = Self(3);
    pub const V4: Self = Self(4);
}

impl fmt::Display for StreamVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// Unit of the exposure time values, as reported by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExposureResolution(pub u32);

impl ExposureResolution {
    pub const MILLISECONDS: Self = Self(0);
    pub const MICROSECONDS: Self = Self(1);
    pub const SECONDS: Self = Self(2);

    /// Unit suffix, or `None` for codes this crate does not know.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            Self::MICROSECONDS => Some("us"),
            Self::MILLISECONDS => Some("ms"),
            Self::SECONDS => Some("s"),
            _ => None,
        }
    }
}

/// Sensor region: inclusive start/end coordinates and a binning factor per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub s1: u16,
    pub s2: u16,
    pub sbin: u16,
    pub p1: u16,
    pub p2: u16,
    pub pbin: u16,
}

impl Region {
    /// Region covering `width` x `height` pixels from the origin without binning.
    pub fn full(width: u16, height: u16) -> Self {
        Self {
            s1: 0,
            s2: width.saturating_sub(1),
            sbin: 1,
            p1: 0,
            p2: height.saturating_sub(1),
            pbin: 1,
        }
    }

    /// Post-binning width; zero for an inverted range or zero binning.
    pub fn width(&self) -> usize {
        binned_extent(self.s1, self.s2, self.sbin)
    }

    /// Post-binning height; zero for an inverted range or zero binning.
    pub fn height(&self) -> usize {
        binned_extent(self.p1, self.p2, self.pbin)
    }

    pub fn is_well_formed(&self) -> bool {
        self.sbin != 0 && self.pbin != 0 && self.s1 <= self.s2 && self.p1 <= self.p2
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{},{},{},{}]",
            self.s1, self.s2, self.sbin, self.p1, self.p2, self.pbin
        )
    }
}

fn binned_extent(start: u16, end: u16, bin: u16) -> usize {
    if bin == 0 || end < start {
        return 0;
    }
    (end as usize - start as usize + 1) / bin as usize
}

/// Sequence-wide descriptor, fixed for the life of a writer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamHeader {
    pub version: StreamVersion,
    /// Number of frames the sequence declares up front.
    pub frame_count: u32,
    pub bit_depth: u16,
    pub region: Region,
    pub exposure_resolution: ExposureResolution,
    pub color_mask: u8,
    pub flags: u8,
    /// Size of one raw frame buffer in bytes; 0 derives it from the region.
    pub frame_size: u32,
}

impl StreamHeader {
    pub fn width(&self) -> usize {
        self.region.width()
    }

    pub fn height(&self) -> usize {
        self.region.height()
    }

    pub fn has_metadata(&self) -> bool {
        self.flags & FLAG_HAS_METADATA != 0
    }

    /// Whether frames are decoded and recomposed rather than passed through.
    pub fn recomposes(&self) -> bool {
        self.version >= StreamVersion::V3 && self.has_metadata()
    }

    /// Number of samples in a full frame.
    pub fn canvas_len(&self) -> usize {
        self.width() * self.height()
    }

    pub fn canvas_bytes(&self) -> usize {
        self.canvas_len() * SAMPLE_BYTES
    }

    pub fn raw_frame_bytes(&self) -> u64 {
        if self.frame_size != 0 {
            self.frame_size as u64
        } else {
            self.canvas_bytes() as u64
        }
    }

    /// Raw bytes of the whole declared sequence.
    pub fn total_raw_bytes(&self) -> u64 {
        self.raw_frame_bytes() * self.frame_count as u64
    }

    /// Largest sample value representable at the stream's bit depth.
    pub fn max_sample_value(&self) -> u16 {
        match self.bit_depth {
            0 => 0,
            depth if depth >= 16 => u16::MAX,
            depth => (1u16 << depth) - 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.region.is_well_formed() || self.width() == 0 || self.height() == 0 {
            return Err(SequenceError::Configuration(format!(
                "region {} yields an empty frame",
                self.region
            )));
        }
        if !(1..=16).contains(&self.bit_depth) {
            return Err(SequenceError::Configuration(format!(
                "bit depth {} is outside 1..=16",
                self.bit_depth
            )));
        }
        Ok(())
    }
}

/// Per-frame acquisition record accompanying a raw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRecord {
    pub frame_number: u32,
    pub readout_time: u32,
    pub exposure_time: u32,
    pub bof_time: u32,
    pub eof_time: u32,
    pub roi_count: u16,
    pub bof_time_high: u32,
    pub eof_time_high: u32,
}

impl FrameRecord {
    /// Beginning-of-frame time in microseconds. The high part only exists from V4 on.
    pub fn bof_time_us(&self, version: StreamVersion) -> u64 {
        widen(self.bof_time, self.bof_time_high, version)
    }

    /// End-of-frame time in microseconds. The high part only exists from V4 on.
    pub fn eof_time_us(&self, version: StreamVersion) -> u64 {
        widen(self.eof_time, self.eof_time_high, version)
    }
}

fn widen(low: u32, high: u32, version: StreamVersion) -> u64 {
    if version >= StreamVersion::V4 {
        ((high as u64) << 32) | low as u64
    } else {
        low as u64
    }
}
