//! Spill file constants plus record and footer read/write helpers.
//!
//! The footer is always the **last 12 bytes** of a spill file:
//!
//! ```text
//! [entry_count: u64 LE][magic: u32 LE = 0x5352_4E31]
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use merge::Entry;
use std::io::{Read, Result as IoResult, Seek, SeekFrom, Write};

/// Magic number identifying spill files (ASCII "SRN1").
pub const SPILL_MAGIC: u32 = 0x5352_4E31;

/// Size of the footer in bytes: 8 (`entry_count`) + 4 (`magic`).
pub const FOOTER_BYTES: u64 = 8 + 4;

/// Returns the byte offset where the footer starts, saturating at 0.
pub fn footer_pos(filesize: u64) -> u64 {
    filesize.saturating_sub(FOOTER_BYTES)
}

pub fn write_footer<W: Write>(w: &mut W, entry_count: u64) -> IoResult<()> {
    w.write_u64::<LittleEndian>(entry_count)?;
    w.write_u32::<LittleEndian>(SPILL_MAGIC)?;
    Ok(())
}

/// Reads the footer from `r`, returning `(entry_count, magic, filesize)`.
///
/// After this call the cursor is at the end of the file.
pub fn read_footer<R: Read + Seek>(r: &mut R) -> IoResult<(u64, u32, u64)> {
    let filesize = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(footer_pos(filesize)))?;
    let entry_count = r.read_u64::<LittleEndian>()?;
    let magic = r.read_u32::<LittleEndian>()?;
    Ok((entry_count, magic, filesize))
}

/// `key_len (u32) | key | val_len (u32) | val`
pub fn write_entry<W: Write>(w: &mut W, entry: &Entry) -> IoResult<()> {
    w.write_u32::<LittleEndian>(entry.key.len() as u32)?;
    w.write_all(&entry.key)?;
    w.write_u32::<LittleEndian>(entry.value.len() as u32)?;
    w.write_all(&entry.value)?;
    Ok(())
}

pub fn read_entry<R: Read>(r: &mut R) -> IoResult<Entry> {
    let key_len = r.read_u32::<LittleEndian>()? as usize;
    let mut key = vec![0u8; key_len];
    r.read_exact(&mut key)?;
    let val_len = r.read_u32::<LittleEndian>()? as usize;
    let mut value = vec![0u8; val_len];
    r.read_exact(&mut value)?;
    Ok(Entry { key, value })
}

/// Encoded size of `entry` as written by [`write_entry`].
pub fn entry_size(entry: &Entry) -> usize {
    4 + entry.key.len() + 4 + entry.value.len()
}
