use std::fs::File;
use std::path::{Path, PathBuf};

use ::tiff::encoder::colortype::Gray16;
use ::tiff::encoder::compression::DeflateLevel;
use ::tiff::encoder::{Compression, TiffEncoder};
use ::tiff::tags::{Predictor, Tag};
use tracing::{debug, error, info, info_span, instrument, warn};

use crate::image_pipeline::common::error::{Result, SequenceError};
use crate::image_pipeline::description::format_image_description;
use crate::image_pipeline::metadata::types::DecodedFrame;
use crate::image_pipeline::recompose::{copy_passthrough, recompose};
use crate::image_pipeline::stream::types::{FrameRecord, StreamHeader};
use crate::image_pipeline::tiff::repair::{patch_page_totals, PAGE_NUMBER_TAG};
use crate::image_pipeline::tiff::types::{TiffCompression, WriterConfig};
use crate::image_pipeline::tiff::writer::SequenceWriter;

/// Classic TIFF addresses the file with 32-bit offsets.
const MAX_SEQUENCE_BYTES: u64 = u32::MAX as u64;

const ORIENTATION_TOP_LEFT: u16 = 1;
const PLANAR_CONFIG_CONTIG: u16 = 1;
const FILETYPE_PAGE: u32 = 2;

struct OpenFile {
    encoder: TiffEncoder<File>,
    /// Second handle on the same file, used to sync once the encoder is gone.
    handle: File,
}

/// Writes one frame sequence to a multi-page TIFF file.
///
/// The canvas and the decoded-metadata scratch are allocated once, when the
/// writer is built, and reused for every frame.
pub struct TiffSequenceWriter {
    path: PathBuf,
    header: StreamHeader,
    config: WriterConfig,
    file: Option<OpenFile>,
    frame_index: u32,
    frame: DecodedFrame,
    canvas: Vec<u16>,
}

impl TiffSequenceWriter {
    pub fn new<P: AsRef<Path>>(path: P, header: StreamHeader, config: WriterConfig) -> Result<Self> {
        if config.validate_header {
            header.validate()?;
        }
        let canvas = vec![0u16; header.canvas_len()];
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            header,
            config,
            file: None,
            frame_index: 0,
            frame: DecodedFrame::new(),
            canvas,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Pixels of the last frame written (or attempted past decoding).
    pub fn canvas(&self) -> &[u16] {
        &self.canvas
    }

    /// Metadata decoded from the last recomposed frame.
    pub fn decoded_frame(&self) -> &DecodedFrame {
        &self.frame
    }

    fn check_sequence_size(&self) -> Result<()> {
        let total = self.header.total_raw_bytes();
        if total > MAX_SEQUENCE_BYTES {
            error!(total, "TIFF format is unable to store more than 4GB raw data");
            return Err(SequenceError::Configuration(format!(
                "{} frames of {} bytes exceed the 4 GiB TIFF limit",
                self.header.frame_count,
                self.header.raw_frame_bytes()
            )));
        }
        if self.header.frame_count > u16::MAX as u32 {
            return Err(SequenceError::Configuration(format!(
                "{} pages cannot be numbered in a TIFF page tag",
                self.header.frame_count
            )));
        }
        Ok(())
    }

    fn open_encoder(&self) -> Result<OpenFile> {
        let file = File::create(&self.path)?;
        let handle = file.try_clone()?;

        let compression = match self.config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = TiffEncoder::new(file)?.with_compression(compression);

        if let Some(predictor_val) = self.config.predictor {
            let predictor = match predictor_val {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        Ok(OpenFile { encoder, handle })
    }

    /// Fills the canvas from `raw`. Returns whether the frame was decoded.
    fn compose_canvas(&mut self, raw: &[u8]) -> Result<bool> {
        if !self.header.recomposes() {
            copy_passthrough(&mut self.canvas, raw)?;
            return Ok(false);
        }

        {
            let _span = info_span!("decode_metadata", raw_size = raw.len()).entered();
            self.frame.decode(raw)?;
        }

        {
            let _span = info_span!("recompose", rois = self.frame.roi_count()).entered();
            recompose(
                &mut self.canvas,
                self.header.width(),
                self.header.height(),
                &self.frame,
                raw,
            )?;
        }

        Ok(true)
    }

    fn page_number(&self) -> Result<Option<[u16; 2]>> {
        if self.header.frame_count <= 1 {
            return Ok(None);
        }
        let index = u16::try_from(self.frame_index).map_err(|_| {
            SequenceError::Configuration(format!(
                "page {} cannot be numbered in a TIFF page tag",
                self.frame_index
            ))
        })?;
        Ok(Some([index, self.header.frame_count as u16]))
    }

    fn finish_close(&mut self, open: OpenFile) -> Result<()> {
        let OpenFile { encoder, handle } = open;
        drop(encoder);
        handle.sync_all()?;
        drop(handle);

        let expected = self.header.frame_count;
        let actual = self.frame_index;
        if expected == actual {
            return Ok(());
        }

        if !self.config.repair_frame_count {
            error!(expected, actual, "File does not contain declared number of frames");
            return Err(SequenceError::Consistency { expected, actual });
        }

        match patch_page_totals(&self.path, actual as u16) {
            Ok(patched) if patched == actual as usize => {
                warn!(expected, actual, "Rewrote page totals to the number of frames written");
                Ok(())
            }
            Ok(patched) => {
                error!(expected, actual, patched, "Not every page carries a page number to repair");
                Err(SequenceError::Consistency { expected, actual })
            }
            Err(e) => {
                error!(expected, actual, error = %e, "Failed to repair page totals");
                Err(SequenceError::Consistency { expected, actual })
            }
        }
    }
}

impl SequenceWriter for TiffSequenceWriter {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        self.check_sequence_size()?;
        let open = {
            let _span = info_span!("create_output_file").entered();
            self.open_encoder()?
        };
        self.file = Some(open);
        self.frame_index = 0;

        info!(
            width = self.header.width(),
            height = self.header.height(),
            frames = self.header.frame_count,
            version = %self.header.version,
            "Opened TIFF sequence"
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    #[instrument(skip(self, metadata, raw), fields(index = self.frame_index, raw_size = raw.len()))]
    fn write_frame(&mut self, metadata: Option<&FrameRecord>, raw: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(SequenceError::NotOpen);
        }

        let page_number = self.page_number()?;
        let decoded = self.compose_canvas(raw)?;

        let description = {
            let _span = info_span!("describe").entered();
            format_image_description(&self.header, metadata, decoded.then_some(&self.frame))
        };

        let width = self.header.width() as u32;
        let height = self.header.height() as u32;
        let open = self.file.as_mut().ok_or(SequenceError::NotOpen)?;
        {
            let _span = info_span!("encode_tiff", width, height).entered();

            let mut image = open.encoder.new_image::<Gray16>(width, height)?;
            image.rows_per_strip(height)?;

            let directory = image.encoder();
            directory.write_tag(Tag::Orientation, ORIENTATION_TOP_LEFT)?;
            directory.write_tag(Tag::PlanarConfiguration, PLANAR_CONFIG_CONTIG)?;
            directory.write_tag(Tag::MaxSampleValue, self.header.max_sample_value())?;
            directory.write_tag(Tag::ImageDescription, description.as_str())?;
            if let Some(page) = page_number {
                // We are writing a single page of a multipage file
                directory.write_tag(Tag::NewSubfileType, FILETYPE_PAGE)?;
                directory.write_tag(Tag::from_u16_exhaustive(PAGE_NUMBER_TAG), &page[..])?;
            }

            image.write_data(&self.canvas[..])?;
        }

        self.frame_index += 1;
        debug!(index = self.frame_index, description_len = description.len(), "Page written");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn close(&mut self) -> Result<()> {
        let Some(open) = self.file.take() else {
            return Ok(());
        };
        let result = self.finish_close(open);
        info!(frames = self.frame_index, ok = result.is_ok(), "Closed TIFF sequence");
        result
    }

    fn frame_index(&self) -> u32 {
        self.frame_index
    }
}

impl Drop for TiffSequenceWriter {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                warn!(path = %self.path.display(), error = %e, "Closing sequence on drop failed");
            }
        }
    }
}
