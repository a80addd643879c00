use log::debug;
use merge::Entry;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::TempPath;

use crate::config::RunConfig;
use crate::format::{read_entry, read_footer, write_entry, write_footer, FOOTER_BYTES, SPILL_MAGIC};
use crate::RunError;

/// A sorted segment written to disk.
///
/// The file lives in the configured spill directory and is removed when this
/// value is dropped.
#[derive(Debug)]
pub(crate) struct SpillFile {
    path: TempPath,
    entries: u64,
}

impl SpillFile {
    /// Writes `entries`, which must already be in key order, to a new spill
    /// file.
    pub(crate) fn write(config: &RunConfig, entries: &[Entry]) -> Result<Self, RunError> {
        let dir = config.resolved_spill_dir();
        std::fs::create_dir_all(&dir)?;

        let (file, path) = tempfile::Builder::new()
            .prefix("run-")
            .suffix(".spill")
            .tempfile_in(&dir)?
            .into_parts();

        let mut w = BufWriter::new(file);
        for entry in entries {
            write_entry(&mut w, entry)?;
        }
        write_footer(&mut w, entries.len() as u64)?;
        w.flush()?;

        let file = w.into_inner().map_err(|e| e.into_error())?;
        if config.sync {
            file.sync_all()?;
        }

        Ok(Self {
            path,
            entries: entries.len() as u64,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn len(&self) -> u64 {
        self.entries
    }

    pub(crate) fn open(&self) -> Result<SpillReader, RunError> {
        let reader = SpillReader::open(&self.path)?;
        if reader.remaining != self.entries {
            return Err(RunError::Corrupt(format!(
                "spill file holds {} entries, expected {}",
                reader.remaining, self.entries
            )));
        }
        Ok(reader)
    }
}

/// Streams the entries of one spill file in stored order.
///
/// Only a buffered read handle is kept open; entries are decoded one at a
/// time as the iterator is advanced.
pub struct SpillReader {
    rdr: BufReader<io::Take<File>>,
    remaining: u64,
}

impl SpillReader {
    /// Opens a spill file and validates its footer.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Corrupt`] if the file is smaller than the footer
    /// or the magic does not match, and [`RunError::Io`] on I/O failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RunError> {
        let mut f = File::open(path.as_ref())?;
        let filesize = f.metadata()?.len();
        if filesize < FOOTER_BYTES {
            return Err(RunError::Corrupt("spill file too small".into()));
        }

        let (entry_count, magic, _) = read_footer(&mut f)?;
        if magic != SPILL_MAGIC {
            return Err(RunError::Corrupt(format!("invalid spill magic: {:x}", magic)));
        }

        f.seek(SeekFrom::Start(0))?;
        debug!(
            "opened spill file {} ({} entries)",
            path.as_ref().display(),
            entry_count
        );

        Ok(Self {
            rdr: BufReader::new(f.take(filesize - FOOTER_BYTES)),
            remaining: entry_count,
        })
    }

    /// Entries not yet read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for SpillReader {
    type Item = Result<Entry, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match read_entry(&mut self.rdr) {
            Ok(entry) => {
                self.remaining -= 1;
                Some(Ok(entry))
            }
            Err(e) => {
                self.remaining = 0;
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    Some(Err(RunError::Corrupt("truncated spill record".into())))
                } else {
                    Some(Err(RunError::Io(e)))
                }
            }
        }
    }
}
