use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::stream::types::FrameRecord;

/// Open/write/close lifecycle of a frame sequence container.
///
/// `open` and `close` are idempotent. A failed `write_frame` leaves the
/// sequence open and the frame index unchanged.
pub trait SequenceWriter {
    fn open(&mut self) -> Result<()>;
    fn is_open(&self) -> bool;
    fn write_frame(&mut self, metadata: Option<&FrameRecord>, raw: &[u8]) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    /// Number of frames written since the last `open`.
    fn frame_index(&self) -> u32;
}
