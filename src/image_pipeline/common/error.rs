use thiserror::Error;

#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("Invalid sequence configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode frame metadata: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid frame geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("File does not contain declared number of frames: expected={expected}, actual={actual}")]
    Consistency { expected: u32, actual: u32 },

    #[error("Failed to encode TIFF page: {0}")]
    Encode(String),

    #[error("Sequence file is not open")]
    NotOpen,
}

impl From<::tiff::TiffError> for SequenceError {
    fn from(err: ::tiff::TiffError) -> Self {
        match err {
            ::tiff::TiffError::IoError(e) => SequenceError::Io(e),
            other => SequenceError::Encode(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Buffer truncated in {section}: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        section: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Invalid frame signature 0x{0:08x}")]
    Signature(u32),

    #[error("Unsupported metadata version {0}")]
    UnsupportedVersion(u8),

    #[error("ROI {roi_nr} has invalid geometry [{s1},{s2},{sbin},{p1},{p2},{pbin}]")]
    InvalidRoi {
        roi_nr: u16,
        s1: u16,
        s2: u16,
        sbin: u16,
        p1: u16,
        p2: u16,
        pbin: u16,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("ROI {roi_nr} at ({x},{y}) size {width}x{height} exceeds canvas {canvas_width}x{canvas_height}")]
    OutOfBounds {
        roi_nr: u16,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        canvas_width: usize,
        canvas_height: usize,
    },

    #[error("Payload is {actual} bytes, expected {expected}")]
    PayloadSize { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, SequenceError>;
