use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use merge::Entry;
use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::config::RunConfig;
use crate::format::{read_entry, write_entry};
use crate::run::SortedRun;
use crate::RunError;

/// Serializes runs as a checksummed stream of sorted records.
///
/// ```text
/// entry_count (u64 LE)
/// repeated: record_len (u32) | crc32 (u32) | key_len (u32) | key | val_len (u32) | val
/// ```
///
/// `record_len` counts the crc and the body. The leading count makes the
/// stream self-delimiting, so it can be embedded in a larger buffer.
pub struct RunCoder;

impl RunCoder {
    /// Writes `entry_count` entries taken from `entries`, which must be in key
    /// order.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on the first error yielded by `entries`, or with
    /// [`RunError::Corrupt`] if `entries` does not yield exactly
    /// `entry_count` items.
    pub fn encode_entries<W, I>(w: &mut W, entry_count: u64, entries: I) -> Result<(), RunError>
    where
        W: Write,
        I: IntoIterator<Item = Result<Entry, RunError>>,
    {
        w.write_u64::<LittleEndian>(entry_count)?;

        let mut written = 0u64;
        let mut body = Vec::new();
        for entry in entries {
            let entry = entry?;
            written += 1;
            if written > entry_count {
                break;
            }

            body.clear();
            write_entry(&mut body, &entry)?;

            let mut hasher = Crc32::new();
            hasher.update(&body);
            let crc = hasher.finalize();

            w.write_u32::<LittleEndian>(body.len() as u32 + 4 /*crc*/)?;
            w.write_u32::<LittleEndian>(crc)?;
            w.write_all(&body)?;
        }

        if written != entry_count {
            return Err(RunError::Corrupt(format!(
                "declared {} entries, source yielded {}",
                entry_count, written
            )));
        }
        w.flush()?;
        Ok(())
    }

    /// Writes `run` in sorted order.
    pub fn encode<W: Write>(w: &mut W, run: &mut SortedRun) -> Result<(), RunError> {
        let len = run.len() as u64;
        Self::encode_entries(w, len, run.replay()?)
    }

    /// Reads a stream written by [`encode_entries`](RunCoder::encode_entries)
    /// back into a run, spilling according to `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Corrupt`] on a checksum mismatch or a truncated
    /// stream, and [`RunError::Unsorted`] if the records are out of order.
    pub fn decode<R: Read>(r: &mut R, config: Arc<RunConfig>) -> Result<SortedRun, RunError> {
        let entry_count = r.read_u64::<LittleEndian>().map_err(truncated)?;
        let records = (0..entry_count).map(|_| read_record(r));
        SortedRun::from_sorted(config, records)
    }
}

fn read_record<R: Read>(r: &mut R) -> Result<Entry, RunError> {
    let record_len = r.read_u32::<LittleEndian>().map_err(truncated)?;
    if record_len < 4 {
        return Err(RunError::Corrupt(format!("record length {}", record_len)));
    }
    let crc = r.read_u32::<LittleEndian>().map_err(truncated)?;
    let mut body = vec![0u8; (record_len - 4) as usize];
    r.read_exact(&mut body).map_err(truncated)?;

    let mut hasher = Crc32::new();
    hasher.update(&body);
    if hasher.finalize() != crc {
        return Err(RunError::Corrupt("checksum mismatch".into()));
    }

    let mut br = &body[..];
    let entry = read_entry(&mut br).map_err(truncated)?;
    if !br.is_empty() {
        return Err(RunError::Corrupt("trailing bytes in record".into()));
    }
    Ok(entry)
}

fn truncated(e: io::Error) -> RunError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        RunError::Corrupt("truncated run stream".into())
    } else {
        RunError::Io(e)
    }
}
