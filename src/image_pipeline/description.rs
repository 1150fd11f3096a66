//! Page description text
//!
//! Every page gets a `key=value` block describing the stream, the frame record
//! and, for recomposed frames, the decoded metadata. Fields only ever get added
//! by newer stream versions, so readers of an older layout keep working.

use std::fmt;

use crate::image_pipeline::metadata::types::DecodedFrame;
use crate::image_pipeline::stream::types::{FrameRecord, StreamHeader, StreamVersion};

const UNKNOWN_UNIT: &str = "<unknown unit>";

/// Renders the description for one page.
///
/// Returns an empty string when there is no frame record. `decoded` is only
/// used for V3+ streams that carry metadata.
pub fn format_image_description(
    header: &StreamHeader,
    record: Option<&FrameRecord>,
    decoded: Option<&DecodedFrame>,
) -> String {
    match record {
        Some(record) => ImageDescription { header, record, decoded }.to_string(),
        None => String::new(),
    }
}

struct ImageDescription<'a> {
    header: &'a StreamHeader,
    record: &'a FrameRecord,
    decoded: Option<&'a DecodedFrame>,
}

impl fmt::Display for ImageDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header;
        let record = self.record;
        let version = header.version;

        write!(f, "bitDepth={}", header.bit_depth)?;

        if version >= StreamVersion::V1 {
            let unit = header.exposure_resolution.unit().unwrap_or(UNKNOWN_UNIT);
            write!(f, "\nregion={}", header.region)?;
            write!(f, "\nframeNr={}", record.frame_number)?;
            write!(f, "\nreadoutTime={}us", record.readout_time)?;
            write!(f, "\nexpTime={}{}", record.exposure_time, unit)?;
        }

        if version >= StreamVersion::V2 {
            write!(f, "\nbofTime={}us", record.bof_time_us(version))?;
            write!(f, "\neofTime={}us", record.eof_time_us(version))?;
        }

        if version >= StreamVersion::V3 {
            write!(f, "\nroiCount={}", record.roi_count)?;
            write!(f, "\ncolorMask={}", header.color_mask as u16)?;
            write!(f, "\nflags=0x{:x}", header.flags as u16)?;
        }

        if let Some(frame) = self.decoded.filter(|_| header.recomposes()) {
            write_decoded(f, frame)?;
        }

        Ok(())
    }
}

fn write_decoded(f: &mut fmt::Formatter<'_>, frame: &DecodedFrame) -> fmt::Result {
    let h = frame.header();
    write!(f, "\nmeta.header.version={}", h.version as u16)?;
    write!(f, "\nmeta.header.frameNr={}", h.frame_nr)?;
    write!(f, "\nmeta.header.roiCount={}", h.roi_count)?;
    write!(f, "\nmeta.header.timeBof={}", h.timestamp_bof)?;
    write!(f, "\nmeta.header.timeEof={}", h.timestamp_eof)?;
    write!(f, "\nmeta.header.timeResNs={}", h.timestamp_res_ns)?;
    write!(f, "\nmeta.header.expTime={}", h.exposure_time)?;
    write!(f, "\nmeta.header.expTimeResNs={}", h.exposure_time_res_ns)?;
    write!(f, "\nmeta.header.roiTimeResNs={}", h.roi_timestamp_res_ns)?;
    write!(f, "\nmeta.header.bitDepth={}", h.bit_depth as u16)?;
    write!(f, "\nmeta.header.colorMask={}", h.color_mask as u16)?;
    write!(f, "\nmeta.header.flags={}", h.flags as u16)?;
    write!(f, "\nmeta.header.extMdSize={}", h.extended_md_size)?;
    write!(f, "\nmeta.extMdSize={}", frame.ext_md_size())?;
    write!(f, "\nmeta.impliedRoi={}", frame.implied_roi())?;
    write!(f, "\nmeta.roiCapacity={}", frame.roi_capacity())?;
    write!(f, "\nmeta.roiCount={}", frame.roi_count())?;

    for (n, roi) in frame.valid_rois() {
        let rh = &roi.header;
        write!(f, "\nmeta.roi[{n}].header.roiNr={}", rh.roi_nr)?;
        if let Some(ts) = rh.timestamps.filter(|_| h.roi_timestamps_supported()) {
            write!(f, "\nmeta.roi[{n}].header.timeBor={}", ts.bor)?;
            write!(f, "\nmeta.roi[{n}].header.timeEor={}", ts.eor)?;
        }
        write!(f, "\nmeta.roi[{n}].header.roi={}", rh.roi)?;
        write!(f, "\nmeta.roi[{n}].header.flags={}", rh.flags as u16)?;
        write!(f, "\nmeta.roi[{n}].header.extMdSize={}", rh.extended_md_size)?;
        write!(f, "\nmeta.roi[{n}].dataSize={}", roi.data_size())?;
        // Duplicates header.extMdSize; label kept for compatibility.
        write!(f, "\nmeta.roi[{n}].extMdSize={}", roi.ext_md_size())?;
    }
    Ok(())
}
