//! Writer configuration

/// Compression applied to every page of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// Pages stored as raw strips
    None,
    Lzw,
    /// Deflate at its fastest level
    DeflateFast,
    /// Deflate at its smallest output
    DeflateBest,
    DeflateBalanced,
}

/// How a [`TiffSequenceWriter`](super::TiffSequenceWriter) encodes pages and
/// handles a sequence that ends with the wrong number of frames.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub compression: TiffCompression,
    /// TIFF predictor code; 2 enables horizontal differencing of samples
    /// before compression, anything else leaves samples as they are.
    pub predictor: Option<u16>,
    /// Reject an empty region or a bit depth outside 1..=16 when the writer is built.
    pub validate_header: bool,
    /// On a frame-count mismatch at close, rewrite every page's PageNumber
    /// total to the frames actually written instead of failing.
    pub repair_frame_count: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
            validate_header: true,
            repair_frame_count: false,
        }
    }
}

impl WriterConfig {
    pub fn builder() -> WriterConfigBuilder {
        WriterConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct WriterConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    validate_header: Option<bool>,
    repair_frame_count: Option<bool>,
}

impl WriterConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn validate_header(mut self, validate: bool) -> Self {
        self.validate_header = Some(validate);
        self
    }

    pub fn repair_frame_count(mut self, repair: bool) -> Self {
        self.repair_frame_count = Some(repair);
        self
    }

    pub fn build(self) -> WriterConfig {
        let default = WriterConfig::default();
        WriterConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            validate_header: self.validate_header.unwrap_or(default.validate_header),
            repair_frame_count: self.repair_frame_count.unwrap_or(default.repair_frame_count),
        }
    }
}
