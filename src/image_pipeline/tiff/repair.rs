//! In-place repair of the page totals of a finished TIFF file.
//!
//! Walks the IFD chain with bounded reads and rewrites the second value of
//! every `PageNumber` entry. Only the classic (32-bit offset) layout is handled.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, instrument};

use crate::image_pipeline::common::error::Result;

/// TIFF `PageNumber` tag: two SHORTs, page index and page total.
pub const PAGE_NUMBER_TAG: u16 = 297;

const TYPE_SHORT: u16 = 3;
const CLASSIC_MAGIC: u16 = 42;
const IFD_ENTRY_SIZE: usize = 12;

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Sets the page total of every page in the TIFF at `path` to `total`.
///
/// Returns the number of `PageNumber` entries rewritten, which is also the
/// number of pages that carried one.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn patch_page_totals<P: AsRef<Path>>(path: P, total: u16) -> Result<usize> {
    let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;

    let mut byte_order = [0u8; 2];
    file.read_exact(&mut byte_order)?;
    let patched = match &byte_order {
        b"II" => patch_with::<LittleEndian>(&mut file, total)?,
        b"MM" => patch_with::<BigEndian>(&mut file, total)?,
        other => return Err(invalid(format!("not a TIFF byte order mark: {other:?}")).into()),
    };
    file.sync_all()?;

    debug!(patched, total, "Patched page totals");
    Ok(patched)
}

fn patch_with<B: ByteOrder>(file: &mut File, total: u16) -> io::Result<usize> {
    let file_len = file.metadata()?.len();

    let magic = file.read_u16::<B>()?;
    if magic != CLASSIC_MAGIC {
        return Err(invalid(format!("unsupported TIFF magic {magic}")));
    }

    let mut patch_offsets = Vec::new();
    let mut visited = HashSet::new();
    let mut ifd_offset = file.read_u32::<B>()? as u64;

    while ifd_offset != 0 {
        if !visited.insert(ifd_offset) {
            return Err(invalid(format!("IFD chain loops back to offset {ifd_offset}")));
        }
        if ifd_offset + 2 > file_len {
            return Err(invalid(format!("IFD offset {ifd_offset} is past end of file")));
        }

        file.seek(SeekFrom::Start(ifd_offset))?;
        let count = file.read_u16::<B>()? as usize;
        let entries_len = count * IFD_ENTRY_SIZE;
        if ifd_offset + 2 + entries_len as u64 + 4 > file_len {
            return Err(invalid(format!("IFD at {ifd_offset} runs past end of file")));
        }

        let mut entries = vec![0u8; entries_len];
        file.read_exact(&mut entries)?;

        for (i, entry) in entries.chunks_exact(IFD_ENTRY_SIZE).enumerate() {
            let tag = B::read_u16(&entry[0..2]);
            let field_type = B::read_u16(&entry[2..4]);
            let value_count = B::read_u32(&entry[4..8]);
            if tag != PAGE_NUMBER_TAG || field_type != TYPE_SHORT || value_count != 2 {
                continue;
            }
            // Two SHORTs fit the 4-byte value field; the total is the second one.
            let entry_offset = ifd_offset + 2 + (i * IFD_ENTRY_SIZE) as u64;
            patch_offsets.push(entry_offset + 8 + 2);
        }

        ifd_offset = file.read_u32::<B>()? as u64;
    }

    for &offset in &patch_offsets {
        file.seek(SeekFrom::Start(offset))?;
        file.write_u16::<B>(total)?;
    }

    Ok(patch_offsets.len())
}
