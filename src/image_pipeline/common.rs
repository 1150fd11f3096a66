//! Common utilities module
//!
//! This module contains shared utilities used across the image pipeline.

pub mod error;
pub mod cursor;

pub use error::{DecodeError, GeometryError, SequenceError, Result};
pub use cursor::ByteCursor;
