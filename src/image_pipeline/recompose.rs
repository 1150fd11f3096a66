//! Frame recomposition
//!
//! Paints the ROI payloads of a decoded frame onto a full-frame canvas of
//! 16-bit samples. Every placement is checked against the canvas before the
//! canvas is touched, so a bad frame never leaves a half-painted canvas behind.

use tracing::debug;

use crate::image_pipeline::common::error::GeometryError;
use crate::image_pipeline::metadata::types::{DecodedFrame, RoiEntry};
use crate::image_pipeline::stream::types::{Region, SAMPLE_BYTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl Placement {
    fn of(implied: &Region, roi: &Region) -> Self {
        Self {
            x: roi.s1.saturating_sub(implied.s1) as usize / roi.sbin.max(1) as usize,
            y: roi.p1.saturating_sub(implied.p1) as usize / roi.pbin.max(1) as usize,
            width: roi.width(),
            height: roi.height(),
        }
    }
}

/// Recomposes `frame` onto `canvas` and returns the number of ROIs painted.
///
/// `raw` must be the buffer `frame` was decoded from. The canvas is zero-filled
/// only after all placements have been validated; on error it is unchanged.
pub fn recompose(
    canvas: &mut [u16],
    canvas_width: usize,
    canvas_height: usize,
    frame: &DecodedFrame,
    raw: &[u8],
) -> Result<usize, GeometryError> {
    check_canvas(canvas, canvas_width, canvas_height)?;

    let implied = frame.implied_roi();
    for (_, roi) in painted_rois(frame) {
        let placement = Placement::of(implied, &roi.header.roi);
        if placement.x + placement.width > canvas_width
            || placement.y + placement.height > canvas_height
        {
            return Err(GeometryError::OutOfBounds {
                roi_nr: roi.header.roi_nr,
                x: placement.x,
                y: placement.y,
                width: placement.width,
                height: placement.height,
                canvas_width,
                canvas_height,
            });
        }
        payload(roi, &placement, raw)?;
    }

    canvas.fill(0);

    let mut painted = 0;
    for (_, roi) in painted_rois(frame) {
        let placement = Placement::of(implied, &roi.header.roi);
        let src = payload(roi, &placement, raw)?;
        let row_bytes = placement.width * SAMPLE_BYTES;
        for (row, src_row) in src.chunks_exact(row_bytes.max(1)).take(placement.height).enumerate() {
            let start = (placement.y + row) * canvas_width + placement.x;
            let dst = &mut canvas[start..start + placement.width];
            decode_samples(dst, src_row);
        }
        painted += 1;
    }

    debug!(painted, rois = frame.roi_count(), "Recomposed frame");
    Ok(painted)
}

/// Copies an unrecomposed raw frame onto the canvas sample for sample.
pub fn copy_passthrough(canvas: &mut [u16], raw: &[u8]) -> Result<(), GeometryError> {
    let expected = canvas.len() * SAMPLE_BYTES;
    if raw.len() != expected {
        return Err(GeometryError::PayloadSize { expected, actual: raw.len() });
    }
    decode_samples(canvas, raw);
    Ok(())
}

fn painted_rois(frame: &DecodedFrame) -> impl Iterator<Item = (usize, &RoiEntry)> {
    frame
        .valid_rois()
        .filter(|(_, roi)| roi.header.carries_pixels())
}

fn payload<'a>(roi: &RoiEntry, placement: &Placement, raw: &'a [u8]) -> Result<&'a [u8], GeometryError> {
    let expected = placement.width * placement.height * SAMPLE_BYTES;
    match roi.payload(raw) {
        Some(bytes) if bytes.len() == expected => Ok(bytes),
        Some(bytes) => Err(GeometryError::PayloadSize { expected, actual: bytes.len() }),
        None => Err(GeometryError::PayloadSize { expected, actual: 0 }),
    }
}

fn check_canvas(canvas: &[u16], width: usize, height: usize) -> Result<(), GeometryError> {
    if canvas.len() != width * height {
        return Err(GeometryError::PayloadSize {
            expected: width * height * SAMPLE_BYTES,
            actual: canvas.len() * SAMPLE_BYTES,
        });
    }
    Ok(())
}

fn decode_samples(dst: &mut [u16], src: &[u8]) {
    for (sample, bytes) in dst.iter_mut().zip(src.chunks_exact(SAMPLE_BYTES)) {
        *sample = u16::from_le_bytes([bytes[0], bytes[1]]);
    }
}
