//! # Sorted runs
//!
//! An append-only buffer of encoded key/value [`Entry`] pairs that can later
//! be replayed in ascending key order.
//!
//! Appends go to an in-memory buffer. When the buffered bytes reach the
//! configured memory budget the buffer is sorted and written to a temporary
//! **spill file**; the run then remembers it as an immutable segment. Replaying
//! a run seals whatever is still buffered (sorting it in place) and k-way
//! merges all segments with [`merge::MergeIter`], so replay memory stays at one
//! head entry per segment.
//!
//! ## Key properties
//! - **Sorted replay**: keys come out non-decreasing; equal keys in no
//!   particular order.
//! - **Multiset**: duplicate keys are kept, nothing is overwritten.
//! - **Cheap clones**: sealed segments are shared behind `Arc`, spill files
//!   are deleted when the last handle goes away.
//! - **Serializable**: [`RunCoder`] writes a run as a checksummed, sorted
//!   record stream and rebuilds it without re-sorting.
//!
//! ## Spill file layout
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ DATA (sorted records)                         │
//! │ key_len (u32) | key | val_len (u32) | val     │
//! │ ... repeated for each entry ...               │
//! ├───────────────────────────────────────────────┤
//! │ FOOTER (always last 12 bytes)                 │
//! │ entry_count (u64 LE) | magic (u32 LE) "SRN1"  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use sortedrun::SortedRun;
//!
//! let mut run = SortedRun::in_memory();
//! run.append(b"b".to_vec(), b"2".to_vec()).unwrap();
//! run.append(b"a".to_vec(), b"1".to_vec()).unwrap();
//!
//! let keys: Vec<Vec<u8>> = run.replay().unwrap().map(|e| e.unwrap().key).collect();
//! assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
//! ```

mod coder;
mod config;
mod format;
mod run;
mod spill;

pub use coder::RunCoder;
pub use config::RunConfig;
pub use format::{FOOTER_BYTES, SPILL_MAGIC};
pub use merge::Entry;
pub use run::{RunReplay, SegmentCursor, SortedRun};
pub use spill::SpillReader;

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt run data: {0}")]
    Corrupt(String),
    #[error("entries out of key order")]
    Unsorted,
}
