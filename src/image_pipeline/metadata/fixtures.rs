//! Encoder for metadata-enabled frame buffers, used by tests across the crate.

use crate::image_pipeline::metadata::types::{
    FRAME_SIGNATURE, ROI_FLAG_HEADER_ONLY, ROI_FLAG_INVALID,
};
use crate::image_pipeline::stream::types::Region;

#[derive(Debug, Clone)]
pub struct RoiSpec {
    roi_nr: u16,
    region: Region,
    flags: u8,
    timestamps: (u32, u32),
    ext_md: Vec<u8>,
    payload: Option<Vec<u8>>,
}

impl RoiSpec {
    pub fn new(roi_nr: u16, region: Region) -> Self {
        Self {
            roi_nr,
            region,
            flags: 0,
            timestamps: (0, 0),
            ext_md: Vec::new(),
            payload: None,
        }
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn timestamps(mut self, bor: u32, eor: u32) -> Self {
        self.timestamps = (bor, eor);
        self
    }

    pub fn ext_md(mut self, bytes: &[u8]) -> Self {
        self.ext_md = bytes.to_vec();
        self
    }

    pub fn pixels(mut self, samples: &[u16]) -> Self {
        self.payload = Some(samples.iter().flat_map(|s| s.to_le_bytes()).collect());
        self
    }

    /// Payload bytes written verbatim, whatever the geometry says.
    pub fn raw_payload(mut self, bytes: Vec<u8>) -> Self {
        self.payload = Some(bytes);
        self
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.roi_nr.to_le_bytes());
        out.extend_from_slice(&self.timestamps.0.to_le_bytes());
        out.extend_from_slice(&self.timestamps.1.to_le_bytes());
        let r = self.region;
        for v in [r.s1, r.s2, r.sbin, r.p1, r.p2, r.pbin] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.push(self.flags);
        out.extend_from_slice(&(self.ext_md.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 7]);
        out.extend_from_slice(&self.ext_md);

        if self.flags & (ROI_FLAG_INVALID | ROI_FLAG_HEADER_ONLY) != 0 {
            return;
        }
        match &self.payload {
            Some(bytes) => out.extend_from_slice(bytes),
            None => out.resize(out.len() + r.width() * r.height() * 2, 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameBuilder {
    frame_nr: u32,
    flags: u8,
    bit_depth: u8,
    color_mask: u8,
    timestamps: (u32, u32),
    exposure_time: u32,
    ext_md: Vec<u8>,
    rois: Vec<RoiSpec>,
}

impl FrameBuilder {
    pub fn new(frame_nr: u32) -> Self {
        Self {
            frame_nr,
            flags: 0,
            bit_depth: 16,
            color_mask: 0,
            timestamps: (0, 0),
            exposure_time: 0,
            ext_md: Vec::new(),
            rois: Vec::new(),
        }
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn bit_depth(mut self, bit_depth: u8) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn color_mask(mut self, color_mask: u8) -> Self {
        self.color_mask = color_mask;
        self
    }

    pub fn timestamps(mut self, bof: u32, eof: u32) -> Self {
        self.timestamps = (bof, eof);
        self
    }

    pub fn exposure_time(mut self, exposure_time: u32) -> Self {
        self.exposure_time = exposure_time;
        self
    }

    pub fn ext_md(mut self, bytes: &[u8]) -> Self {
        self.ext_md = bytes.to_vec();
        self
    }

    pub fn roi(mut self, roi: RoiSpec) -> Self {
        self.rois.push(roi);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&FRAME_SIGNATURE.to_le_bytes());
        out.push(1);
        out.extend_from_slice(&self.frame_nr.to_le_bytes());
        out.extend_from_slice(&(self.rois.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.timestamps.0.to_le_bytes());
        out.extend_from_slice(&self.timestamps.1.to_le_bytes());
        // Timestamp resolution, exposure, exposure resolution, ROI timestamp resolution.
        out.extend_from_slice(&1000u32.to_le_bytes());
        out.extend_from_slice(&self.exposure_time.to_le_bytes());
        out.extend_from_slice(&1000u32.to_le_bytes());
        out.extend_from_slice(&1000u32.to_le_bytes());
        out.push(self.bit_depth);
        out.push(self.color_mask);
        out.push(self.flags);
        out.extend_from_slice(&(self.ext_md.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&self.ext_md);
        for roi in &self.rois {
            roi.encode(&mut out);
        }
        out
    }
}
