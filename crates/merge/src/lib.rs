//! # Merge
//!
//! Key/value entries and the k-way merge that combines sorted sequences of
//! them.
//!
//! An [`Entry`] is a pair of immutable byte strings. Entries are ordered by
//! their key only, using unsigned lexicographic comparison (a key that is a
//! strict prefix of another sorts first). Values never take part in ordering.
//!
//! [`MergeIter`] takes any number of sources that each yield entries in
//! non-decreasing key order and produces a single globally ordered sequence.
//! It is lazy: nothing is read from a source until the first call to `next`,
//! and at any time it holds at most one buffered head entry per source.
//!
//! ## Example
//! ```rust
//! use merge::{Entry, MergeIter};
//!
//! let entry = |k: &[u8]| Entry::new(k.to_vec(), Vec::new());
//! let a = vec![entry(b"a"), entry(b"c")];
//! let b = vec![entry(b"b")];
//!
//! let sources = [a, b].map(|run| run.into_iter().map(Ok::<_, ()>));
//! let keys: Vec<Vec<u8>> = MergeIter::new(sources)
//!     .map(|e| e.unwrap().key)
//!     .collect();
//! assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
//! ```

mod entry;
mod iter;

pub use entry::{compare_keys, Entry};
pub use iter::MergeIter;
