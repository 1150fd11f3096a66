//! Bounds-checked little-endian reader over a borrowed byte slice.

use byteorder::{ByteOrder, LittleEndian};

use crate::image_pipeline::common::error::DecodeError;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    section: &'static str,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, section: "buffer" }
    }

    /// Names the section being read; truncation errors report it.
    pub fn section(&mut self, name: &'static str) -> &mut Self {
        self.section = name;
        self
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::Truncated {
            section: self.section,
            offset: self.pos,
            needed,
            available: self.remaining(),
        }
    }

    /// Checks that at least `len` more bytes are available without consuming them.
    pub fn require(&self, len: usize) -> Result<(), DecodeError> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        Ok(())
    }

    /// Returns the byte range of the next `len` bytes and advances past them.
    pub fn take_range(&mut self, len: usize) -> Result<std::ops::Range<usize>, DecodeError> {
        self.require(len)?;
        let range = self.pos..self.pos + len;
        self.pos = range.end;
        Ok(range)
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let range = self.take_range(len)?;
        Ok(&self.data[range])
    }

    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.take_range(len).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }
}
