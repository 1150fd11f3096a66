use tracing::{debug, trace};

use crate::image_pipeline::common::cursor::ByteCursor;
use crate::image_pipeline::common::error::DecodeError;
use crate::image_pipeline::metadata::types::{
    DecodedFrame, FrameHeader, RoiEntry, RoiHeader, RoiTimestamps, FRAME_SIGNATURE, ROI_HEADER_SIZE,
};
use crate::image_pipeline::stream::types::{Region, SAMPLE_BYTES};

const FRAME_HEADER_RESERVED: usize = 8;
const ROI_HEADER_RESERVED: usize = 7;

impl DecodedFrame {
    /// Decodes `raw` into this structure, replacing the previous frame.
    ///
    /// Every section is bounds-checked against `raw`; on error the frame is left
    /// empty (no ROIs) and must not be used for recomposition. The ROI capacity
    /// only grows on a successful decode.
    pub fn decode(&mut self, raw: &[u8]) -> Result<(), DecodeError> {
        self.rois.clear();
        let result = self.decode_inner(raw);
        if result.is_err() {
            self.rois.clear();
            self.header = FrameHeader::default();
            self.ext_md = 0..0;
            self.implied_roi = Region::default();
        }
        result
    }

    fn decode_inner(&mut self, raw: &[u8]) -> Result<(), DecodeError> {
        let mut cursor = ByteCursor::new(raw);
        let header = read_frame_header(&mut cursor)?;

        cursor.section("frame extended metadata");
        let ext_md = cursor.take_range(header.extended_md_size as usize)?;

        // Every declared ROI needs at least its header.
        let roi_count = header.roi_count as usize;
        cursor.section("roi header");
        cursor.require(roi_count * ROI_HEADER_SIZE)?;
        self.rois.reserve(roi_count);

        let mut implied: Option<Region> = None;
        for _ in 0..roi_count {
            let roi_header = read_roi_header(&mut cursor, header.roi_timestamps_supported())?;

            cursor.section("roi extended metadata");
            let roi_ext_md = cursor.take_range(roi_header.extended_md_size as usize)?;

            let data_len = if roi_header.carries_pixels() {
                roi_payload_bytes(&roi_header)?
            } else {
                0
            };
            cursor.section("roi data");
            let data = cursor.take_range(data_len)?;

            if !roi_header.is_invalid() {
                if !roi_header.roi.is_well_formed() {
                    return Err(invalid_roi(&roi_header));
                }
                implied = Some(match implied {
                    None => roi_header.roi,
                    Some(acc) => bounding(acc, roi_header.roi),
                });
            }

            trace!(roi_nr = roi_header.roi_nr, data_len, "Decoded ROI");
            self.rois.push(RoiEntry {
                header: roi_header,
                data,
                ext_md: roi_ext_md,
            });
        }

        if cursor.remaining() > 0 {
            trace!(trailing = cursor.remaining(), "Ignoring bytes after last ROI");
        }

        if roi_count > self.roi_capacity {
            debug!(old = self.roi_capacity, new = roi_count, "Growing ROI capacity");
            self.roi_capacity = roi_count;
        }

        self.header = header;
        self.ext_md = ext_md;
        self.implied_roi = implied.unwrap_or_default();
        Ok(())
    }
}

fn read_frame_header(cursor: &mut ByteCursor<'_>) -> Result<FrameHeader, DecodeError> {
    cursor.section("frame header");
    let signature = cursor.u32()?;
    if signature != FRAME_SIGNATURE {
        return Err(DecodeError::Signature(signature));
    }
    let version = cursor.u8()?;
    if version == 0 {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let header = FrameHeader {
        version,
        frame_nr: cursor.u32()?,
        roi_count: cursor.u16()?,
        timestamp_bof: cursor.u32()?,
        timestamp_eof: cursor.u32()?,
        timestamp_res_ns: cursor.u32()?,
        exposure_time: cursor.u32()?,
        exposure_time_res_ns: cursor.u32()?,
        roi_timestamp_res_ns: cursor.u32()?,
        bit_depth: cursor.u8()?,
        color_mask: cursor.u8()?,
        flags: cursor.u8()?,
        extended_md_size: cursor.u16()?,
    };
    cursor.skip(FRAME_HEADER_RESERVED)?;
    Ok(header)
}

fn read_roi_header(
    cursor: &mut ByteCursor<'_>,
    timestamps_supported: bool,
) -> Result<RoiHeader, DecodeError> {
    cursor.section("roi header");
    let roi_nr = cursor.u16()?;
    let bor = cursor.u32()?;
    let eor = cursor.u32()?;
    let roi = Region {
        s1: cursor.u16()?,
        s2: cursor.u16()?,
        sbin: cursor.u16()?,
        p1: cursor.u16()?,
        p2: cursor.u16()?,
        pbin: cursor.u16()?,
    };
    let flags = cursor.u8()?;
    let extended_md_size = cursor.u16()?;
    cursor.skip(ROI_HEADER_RESERVED)?;

    Ok(RoiHeader {
        roi_nr,
        timestamps: timestamps_supported.then_some(RoiTimestamps { bor, eor }),
        roi,
        flags,
        extended_md_size,
    })
}

fn roi_payload_bytes(header: &RoiHeader) -> Result<usize, DecodeError> {
    if !header.roi.is_well_formed() {
        return Err(invalid_roi(header));
    }
    Ok(header.roi.width() * header.roi.height() * SAMPLE_BYTES)
}

fn bounding(acc: Region, roi: Region) -> Region {
    Region {
        s1: acc.s1.min(roi.s1),
        s2: acc.s2.max(roi.s2),
        sbin: acc.sbin,
        p1: acc.p1.min(roi.p1),
        p2: acc.p2.max(roi.p2),
        pbin: acc.pbin,
    }
}

fn invalid_roi(header: &RoiHeader) -> DecodeError {
    let r = header.roi;
    DecodeError::InvalidRoi {
        roi_nr: header.roi_nr,
        s1: r.s1,
        s2: r.s2,
        sbin: r.sbin,
        p1: r.p1,
        p2: r.p2,
        pbin: r.pbin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::metadata::fixtures::{FrameBuilder, RoiSpec};
    use crate::image_pipeline::metadata::types::{
        FRAME_FLAG_ROI_TS_SUPPORTED, FRAME_HEADER_SIZE, ROI_FLAG_HEADER_ONLY, ROI_FLAG_INVALID,
        ROI_HEADER_SIZE,
    };

    #[test]
    fn test_decode_single_roi() {
        let pixels: Vec<u16> = (1..=16).collect();
        let raw = FrameBuilder::new(7)
            .roi(RoiSpec::new(1, Region::full(4, 4)).pixels(&pixels))
            .build();

        let mut frame = DecodedFrame::new();
        frame.decode(&raw).unwrap();

        assert_eq!(frame.header().frame_nr, 7);
        assert_eq!(frame.header().roi_count, 1);
        assert_eq!(frame.roi_count(), 1);
        assert_eq!(frame.roi_capacity(), 1);
        assert_eq!(*frame.implied_roi(), Region::full(4, 4));

        let roi = &frame.rois()[0];
        assert_eq!(roi.header.roi_nr, 1);
        assert_eq!(roi.data_size(), 32);
        assert_eq!(roi.data.start, FRAME_HEADER_SIZE + ROI_HEADER_SIZE);
        assert_eq!(roi.payload(&raw).unwrap()[..2], [1, 0]);
        assert_eq!(roi.header.timestamps, None);
    }

    #[test]
    fn test_implied_roi_spans_valid_rois_only() {
        let raw = FrameBuilder::new(1)
            .roi(RoiSpec::new(1, Region { s1: 10, s2: 19, sbin: 1, p1: 5, p2: 6, pbin: 1 }))
            .roi(RoiSpec::new(2, Region { s1: 0, s2: 0, sbin: 1, p1: 0, p2: 0, pbin: 1 }).flags(ROI_FLAG_INVALID))
            .roi(RoiSpec::new(3, Region { s1: 30, s2: 39, sbin: 1, p1: 2, p2: 3, pbin: 1 }))
            .build();

        let mut frame = DecodedFrame::new();
        frame.decode(&raw).unwrap();

        assert_eq!(frame.roi_count(), 3);
        assert_eq!(
            *frame.implied_roi(),
            Region { s1: 10, s2: 39, sbin: 1, p1: 2, p2: 6, pbin: 1 }
        );
        // Invalid ROIs carry no payload.
        assert_eq!(frame.rois()[1].data_size(), 0);
        let valid: Vec<usize> = frame.valid_rois().map(|(n, _)| n).collect();
        assert_eq!(valid, vec![0, 2]);
    }

    #[test]
    fn test_extended_metadata_sections() {
        let raw = FrameBuilder::new(1)
            .ext_md(&[0xAA; 5])
            .roi(RoiSpec::new(1, Region::full(2, 1)).ext_md(&[0xBB; 3]).pixels(&[9, 8]))
            .build();

        let mut frame = DecodedFrame::new();
        frame.decode(&raw).unwrap();

        assert_eq!(frame.ext_md_size(), 5);
        let roi = &frame.rois()[0];
        assert_eq!(roi.ext_md_size(), 3);
        assert_eq!(roi.header.extended_md_size, 3);
        assert_eq!(&raw[roi.ext_md.clone()], &[0xBB; 3]);
        assert_eq!(roi.payload(&raw).unwrap(), &[9, 0, 8, 0]);
    }

    #[test]
    fn test_roi_timestamps_follow_frame_flag() {
        let spec = RoiSpec::new(1, Region::full(1, 1)).timestamps(100, 200);
        let with = FrameBuilder::new(1).flags(FRAME_FLAG_ROI_TS_SUPPORTED).roi(spec.clone()).build();
        let without = FrameBuilder::new(1).roi(spec).build();

        let mut frame = DecodedFrame::new();
        frame.decode(&with).unwrap();
        assert_eq!(frame.rois()[0].header.timestamps, Some(RoiTimestamps { bor: 100, eor: 200 }));

        frame.decode(&without).unwrap();
        assert_eq!(frame.rois()[0].header.timestamps, None);
    }

    #[test]
    fn test_header_only_roi_has_no_payload() {
        let raw = FrameBuilder::new(1)
            .roi(RoiSpec::new(1, Region::full(4, 4)).flags(ROI_FLAG_HEADER_ONLY))
            .build();
        assert_eq!(raw.len(), FRAME_HEADER_SIZE + ROI_HEADER_SIZE);

        let mut frame = DecodedFrame::new();
        frame.decode(&raw).unwrap();
        assert_eq!(frame.rois()[0].data_size(), 0);
        assert!(!frame.rois()[0].header.is_invalid());
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        let raw = FrameBuilder::new(1)
            .roi(RoiSpec::new(1, Region::full(4, 4)))
            .build();

        let mut frame = DecodedFrame::new();
        let err = frame.decode(&raw[..raw.len() - 1]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { section: "roi data", .. }));
        assert_eq!(frame.roi_count(), 0);
    }

    #[test]
    fn test_truncated_header_is_rejected() {
        let raw = FrameBuilder::new(1).build();
        let mut frame = DecodedFrame::new();
        let err = frame.decode(&raw[..20]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { section: "frame header", .. }));
    }

    #[test]
    fn test_declared_roi_count_beyond_buffer() {
        let mut raw = FrameBuilder::new(1)
            .roi(RoiSpec::new(1, Region::full(1, 1)))
            .build();
        // roiCount lives right after signature, version and frameNr.
        raw[9..11].copy_from_slice(&2u16.to_le_bytes());

        let mut frame = DecodedFrame::new();
        let err = frame.decode(&raw).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { section: "roi header", .. }));
    }

    #[test]
    fn test_oversized_roi_count_leaves_scratch_unchanged() {
        let one = FrameBuilder::new(1).roi(RoiSpec::new(1, Region::full(1, 1))).build();
        let mut bogus = FrameBuilder::new(2).build();
        bogus[9..11].copy_from_slice(&60_000u16.to_le_bytes());

        let mut frame = DecodedFrame::new();
        frame.decode(&one).unwrap();
        assert_eq!(frame.roi_capacity(), 1);

        let err = frame.decode(&bogus).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                section: "roi header",
                offset: FRAME_HEADER_SIZE,
                needed: 60_000 * ROI_HEADER_SIZE,
                available: 0,
            }
        );
        assert_eq!(frame.roi_capacity(), 1);
        assert_eq!(frame.roi_count(), 0);

        frame.decode(&one).unwrap();
        assert_eq!(frame.roi_capacity(), 1);
        assert_eq!(frame.roi_count(), 1);
    }

    #[test]
    fn test_failed_roi_section_keeps_capacity() {
        // Headers fit but the last ROI's payload is cut short.
        let raw = FrameBuilder::new(1)
            .roi(RoiSpec::new(1, Region::full(1, 1)))
            .roi(RoiSpec::new(2, Region::full(1, 1)))
            .roi(RoiSpec::new(3, Region::full(4, 4)))
            .build();

        let mut frame = DecodedFrame::new();
        assert!(frame.decode(&raw[..raw.len() - 2]).is_err());
        assert_eq!(frame.roi_capacity(), 0);
    }

    #[test]
    fn test_bad_signature() {
        let mut raw = FrameBuilder::new(1).build();
        raw[0] ^= 0xFF;
        let mut frame = DecodedFrame::new();
        assert!(matches!(frame.decode(&raw), Err(DecodeError::Signature(_))));
    }

    #[test]
    fn test_zero_binning_is_rejected() {
        let raw = FrameBuilder::new(1)
            .roi(RoiSpec::new(4, Region { s1: 0, s2: 3, sbin: 0, p1: 0, p2: 3, pbin: 1 }).raw_payload(Vec::new()))
            .build();
        let mut frame = DecodedFrame::new();
        assert!(matches!(frame.decode(&raw), Err(DecodeError::InvalidRoi { roi_nr: 4, .. })));
    }

    #[test]
    fn test_capacity_grows_and_never_shrinks() {
        let three = FrameBuilder::new(1)
            .roi(RoiSpec::new(1, Region::full(1, 1)))
            .roi(RoiSpec::new(2, Region::full(1, 1)))
            .roi(RoiSpec::new(3, Region::full(1, 1)))
            .build();
        let one = FrameBuilder::new(2).roi(RoiSpec::new(1, Region::full(1, 1))).build();

        let mut frame = DecodedFrame::with_roi_capacity(2);
        frame.decode(&one).unwrap();
        assert_eq!(frame.roi_capacity(), 2);
        frame.decode(&three).unwrap();
        assert_eq!(frame.roi_capacity(), 3);
        frame.decode(&one).unwrap();
        assert_eq!(frame.roi_capacity(), 3);
        assert_eq!(frame.roi_count(), 1);
    }

    #[test]
    fn test_frame_without_valid_rois() {
        let raw = FrameBuilder::new(1)
            .roi(RoiSpec::new(1, Region::full(2, 2)).flags(ROI_FLAG_INVALID))
            .build();
        let mut frame = DecodedFrame::new();
        frame.decode(&raw).unwrap();
        assert_eq!(*frame.implied_roi(), Region::default());
        assert_eq!(frame.valid_rois().count(), 0);
    }
}
