use log::debug;
use merge::{Entry, MergeIter};
use std::sync::Arc;

use crate::config::RunConfig;
use crate::format::entry_size;
use crate::spill::{SpillFile, SpillReader};
use crate::RunError;

/// An immutable, sorted part of a run.
#[derive(Debug, Clone)]
enum Segment {
    Memory(Arc<[Entry]>),
    Spilled(Arc<SpillFile>),
}

impl Segment {
    fn cursor(&self) -> Result<SegmentCursor, RunError> {
        match self {
            Segment::Memory(entries) => Ok(SegmentCursor::Memory {
                entries: Arc::clone(entries),
                pos: 0,
            }),
            Segment::Spilled(file) => Ok(SegmentCursor::Spilled(file.open()?)),
        }
    }
}

/// Read cursor over one sealed segment.
pub enum SegmentCursor {
    Memory { entries: Arc<[Entry]>, pos: usize },
    Spilled(SpillReader),
}

impl Iterator for SegmentCursor {
    type Item = Result<Entry, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SegmentCursor::Memory { entries, pos } => {
                let entry = entries.get(*pos)?.clone();
                *pos += 1;
                Some(Ok(entry))
            }
            SegmentCursor::Spilled(reader) => reader.next(),
        }
    }
}

/// Sorted replay of a whole run: a k-way merge over its segments.
pub type RunReplay = MergeIter<SegmentCursor>;

/// An append-only multiset of entries with sorted replay.
///
/// Appended entries are buffered unsorted. Once the buffered bytes reach
/// [`RunConfig::memory_budget`] the buffer is sorted and spilled to disk.
/// [`replay`](SortedRun::replay) seals the remaining buffer into an in-memory
/// segment and merges every segment.
#[derive(Debug, Clone)]
pub struct SortedRun {
    config: Arc<RunConfig>,
    pending: Vec<Entry>,
    pending_bytes: usize,
    segments: Vec<Segment>,
    len: usize,
    approx_size: usize,
}

impl SortedRun {
    /// Creates a new, empty run.
    pub fn new(config: Arc<RunConfig>) -> Self {
        Self {
            config,
            pending: Vec::new(),
            pending_bytes: 0,
            segments: Vec::new(),
            len: 0,
            approx_size: 0,
        }
    }

    /// Creates a run that never spills.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(RunConfig::in_memory()))
    }

    /// Rebuilds a run from entries that are already in key order.
    ///
    /// Entries are grouped into segments of at most the memory budget; full
    /// segments are spilled as they are, without sorting.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Unsorted`] if a key is smaller than its
    /// predecessor, or the first error produced by `entries`.
    pub fn from_sorted<I>(config: Arc<RunConfig>, entries: I) -> Result<Self, RunError>
    where
        I: IntoIterator<Item = Result<Entry, RunError>>,
    {
        let mut run = Self::new(config);
        let mut chunk: Vec<Entry> = Vec::new();
        let mut chunk_bytes = 0usize;
        // Last key of the most recently spilled chunk.
        let mut spilled_last: Option<Vec<u8>> = None;

        for entry in entries {
            let entry = entry?;
            let prev = chunk
                .last()
                .map(|e| e.key.as_slice())
                .or(spilled_last.as_deref());
            if prev.is_some_and(|p| p > entry.key.as_slice()) {
                return Err(RunError::Unsorted);
            }

            run.len += 1;
            run.approx_size = run.approx_size.saturating_add(entry.byte_len());
            chunk_bytes = chunk_bytes.saturating_add(entry.byte_len());
            chunk.push(entry);

            if chunk_bytes >= run.config.memory_budget {
                let spill = SpillFile::write(&run.config, &chunk)?;
                run.segments.push(Segment::Spilled(Arc::new(spill)));
                spilled_last = chunk.pop().map(|e| e.key);
                chunk.clear();
                chunk_bytes = 0;
            }
        }

        if !chunk.is_empty() {
            run.segments.push(Segment::Memory(Arc::from(chunk)));
        }
        Ok(run)
    }

    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// Only fails if the append crosses the memory budget and the spill
    /// cannot be written. The entry is kept in memory in that case.
    pub fn append(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), RunError> {
        let entry = Entry { key, value };
        let bytes = entry.byte_len();

        self.pending.push(entry);
        self.pending_bytes = self.pending_bytes.saturating_add(bytes);
        self.approx_size = self.approx_size.saturating_add(bytes);
        self.len += 1;

        if self.pending_bytes >= self.config.memory_budget {
            self.spill()?;
        }
        Ok(())
    }

    /// Sorts and writes the in-memory buffer to a new spill file.
    pub fn spill(&mut self) -> Result<(), RunError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.pending.sort_unstable_by(Entry::cmp_key);

        let spill = SpillFile::write(&self.config, &self.pending)?;
        debug!(
            "spilled {} entries ({} bytes, {} on disk) to {}",
            spill.len(),
            self.pending_bytes,
            self.pending.iter().map(entry_size).sum::<usize>(),
            spill.path().display()
        );

        self.segments.push(Segment::Spilled(Arc::new(spill)));
        self.pending.clear();
        self.pending_bytes = 0;
        Ok(())
    }

    /// Replays every entry in ascending key order.
    ///
    /// The in-memory buffer is sorted and sealed first, so later appends start
    /// a new segment. The run itself is left intact and can be replayed again.
    ///
    /// # Errors
    ///
    /// Fails if a spill file cannot be opened or is corrupt. Errors while
    /// streaming are returned by the iterator.
    pub fn replay(&mut self) -> Result<RunReplay, RunError> {
        Ok(MergeIter::new(self.cursors()?))
    }

    /// Seals the buffer and opens one cursor per segment, each in key order.
    ///
    /// Callers merging several runs can feed all cursors into a single
    /// [`MergeIter`] instead of nesting one merge per run.
    pub fn cursors(&mut self) -> Result<Vec<SegmentCursor>, RunError> {
        self.seal();
        self.segments.iter().map(Segment::cursor).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the run holds zero entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Approximate key + value bytes held, in memory and on disk.
    pub fn approx_size(&self) -> usize {
        self.approx_size
    }

    /// Number of segments written to disk.
    pub fn spilled_segments(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Spilled(_)))
            .count()
    }

    /// Number of sealed segments (in memory or on disk).
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn config(&self) -> &Arc<RunConfig> {
        &self.config
    }

    fn seal(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_unstable_by(Entry::cmp_key);
        self.segments.push(Segment::Memory(Arc::from(pending)));
        self.pending_bytes = 0;
    }
}

impl Default for SortedRun {
    fn default() -> Self {
        Self::new(Arc::new(RunConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn keys(run: &mut SortedRun) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        for entry in run.replay()? {
            out.push(entry?.key);
        }
        Ok(out)
    }

    fn spilling(dir: &std::path::Path, budget: usize) -> Arc<RunConfig> {
        Arc::new(
            RunConfig::new()
                .with_memory_budget(budget)
                .with_spill_dir(dir),
        )
    }

    fn spill_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "spill")
                    .unwrap_or(false)
            })
            .count()
    }

    // -------------------- Basic append / replay --------------------

    #[test]
    fn replay_sorts_appended_entries() -> Result<()> {
        let mut run = SortedRun::in_memory();
        run.append(b"c".to_vec(), b"3".to_vec())?;
        run.append(b"a".to_vec(), b"1".to_vec())?;
        run.append(b"b".to_vec(), b"2".to_vec())?;

        assert_eq!(run.len(), 3);
        assert_eq!(keys(&mut run)?, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        Ok(())
    }

    #[test]
    fn empty_run() -> Result<()> {
        let mut run = SortedRun::in_memory();
        assert!(run.is_empty());
        assert_eq!(run.approx_size(), 0);
        assert_eq!(run.replay()?.count(), 0);
        assert_eq!(run.segment_count(), 0);
        Ok(())
    }

    #[test]
    fn duplicate_keys_are_kept() -> Result<()> {
        let mut run = SortedRun::in_memory();
        run.append(b"k".to_vec(), b"first".to_vec())?;
        run.append(b"k".to_vec(), b"second".to_vec())?;

        let mut values: Vec<Vec<u8>> = run
            .replay()?
            .map(|e| e.map(|e| e.value))
            .collect::<Result<_, _>>()?;
        values.sort();
        assert_eq!(values, vec![b"first".to_vec(), b"second".to_vec()]);
        Ok(())
    }

    #[test]
    fn replay_is_repeatable() -> Result<()> {
        let mut run = SortedRun::in_memory();
        for k in [5u8, 3, 9, 1] {
            run.append(vec![k], vec![])?;
        }
        let first = keys(&mut run)?;
        let second = keys(&mut run)?;
        assert_eq!(first, second);
        assert_eq!(run.segment_count(), 1);
        Ok(())
    }

    #[test]
    fn append_after_replay_starts_new_segment() -> Result<()> {
        let mut run = SortedRun::in_memory();
        run.append(vec![2], vec![])?;
        run.append(vec![4], vec![])?;
        let _ = keys(&mut run)?;

        run.append(vec![3], vec![])?;
        run.append(vec![1], vec![])?;
        assert_eq!(keys(&mut run)?, vec![vec![1], vec![2], vec![3], vec![4]]);
        assert_eq!(run.segment_count(), 2);
        Ok(())
    }

    #[test]
    fn unsigned_byte_order() -> Result<()> {
        let mut run = SortedRun::in_memory();
        run.append(vec![0x80], vec![])?;
        run.append(vec![0x7F], vec![])?;
        run.append(vec![0xFF, 0x00], vec![])?;
        run.append(vec![0xFF], vec![])?;
        assert_eq!(
            keys(&mut run)?,
            vec![vec![0x7F], vec![0x80], vec![0xFF], vec![0xFF, 0x00]]
        );
        Ok(())
    }

    #[test]
    fn approx_size_counts_key_and_value() -> Result<()> {
        let mut run = SortedRun::in_memory();
        run.append(b"ab".to_vec(), b"ccc".to_vec())?;
        run.append(b"d".to_vec(), b"".to_vec())?;
        assert_eq!(run.approx_size(), 6);
        Ok(())
    }

    // -------------------- Spilling --------------------

    #[test]
    fn crossing_budget_spills_to_disk() -> Result<()> {
        let dir = tempdir()?;
        let mut run = SortedRun::new(spilling(dir.path(), 64));

        for i in (0..100u32).rev() {
            run.append(format!("key{:03}", i).into_bytes(), vec![b'v'; 10])?;
        }

        assert!(run.spilled_segments() >= 5, "expected several spills");
        assert_eq!(spill_files(dir.path()), run.spilled_segments());

        let expected: Vec<Vec<u8>> = (0..100u32)
            .map(|i| format!("key{:03}", i).into_bytes())
            .collect();
        assert_eq!(keys(&mut run)?, expected);
        Ok(())
    }

    #[test]
    fn spill_files_removed_when_run_dropped() -> Result<()> {
        let dir = tempdir()?;
        let mut run = SortedRun::new(spilling(dir.path(), 1));
        run.append(b"a".to_vec(), b"1".to_vec())?;
        run.append(b"b".to_vec(), b"2".to_vec())?;
        assert_eq!(spill_files(dir.path()), 2);

        let clone = run.clone();
        drop(run);
        assert_eq!(spill_files(dir.path()), 2, "clone still shares the files");

        drop(clone);
        assert_eq!(spill_files(dir.path()), 0);
        Ok(())
    }

    #[test]
    fn explicit_spill_of_empty_buffer_is_noop() -> Result<()> {
        let dir = tempdir()?;
        let mut run = SortedRun::new(spilling(dir.path(), usize::MAX));
        run.spill()?;
        assert_eq!(run.spilled_segments(), 0);

        run.append(b"x".to_vec(), vec![])?;
        run.spill()?;
        assert_eq!(run.spilled_segments(), 1);
        assert_eq!(keys(&mut run)?, vec![b"x".to_vec()]);
        Ok(())
    }

    #[test]
    fn mixed_memory_and_spilled_segments() -> Result<()> {
        let dir = tempdir()?;
        let mut run = SortedRun::new(spilling(dir.path(), 30));
        for k in [9u8, 7, 5, 3, 1, 8, 6, 4, 2, 0] {
            run.append(vec![k], vec![0u8; 4])?;
        }
        assert!(run.spilled_segments() >= 1);

        let got = keys(&mut run)?;
        let expected: Vec<Vec<u8>> = (0..10u8).map(|k| vec![k]).collect();
        assert_eq!(got, expected);
        Ok(())
    }

    #[test]
    fn unwritable_spill_dir_keeps_entry() -> Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file")?;

        let mut run = SortedRun::new(spilling(&blocker, 1));
        assert!(run.append(b"k".to_vec(), b"v".to_vec()).is_err());
        assert_eq!(run.len(), 1);
        Ok(())
    }

    // -------------------- from_sorted --------------------

    #[test]
    fn from_sorted_rebuilds_in_order() -> Result<()> {
        let entries = (0..10u8).map(|k| Ok(Entry::new(vec![k], vec![k])));
        let mut run = SortedRun::from_sorted(Arc::new(RunConfig::in_memory()), entries)?;
        assert_eq!(run.len(), 10);
        assert_eq!(run.segment_count(), 1);
        assert_eq!(keys(&mut run)?, (0..10u8).map(|k| vec![k]).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn from_sorted_spills_large_input_in_chunks() -> Result<()> {
        let dir = tempdir()?;
        let entries = (0..50u8).map(|k| Ok(Entry::new(vec![k], vec![0u8; 8])));
        let mut run = SortedRun::from_sorted(spilling(dir.path(), 40), entries)?;
        assert!(run.spilled_segments() >= 5);
        assert_eq!(keys(&mut run)?, (0..50u8).map(|k| vec![k]).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn from_sorted_rejects_out_of_order() {
        let entries = [2u8, 1].map(|k| Ok(Entry::new(vec![k], vec![])));
        let result = SortedRun::from_sorted(Arc::new(RunConfig::in_memory()), entries);
        assert!(matches!(result, Err(RunError::Unsorted)));
    }

    #[test]
    fn from_sorted_rejects_out_of_order_across_spill() -> Result<()> {
        let dir = tempdir()?;
        let entries = [5u8, 6, 1].map(|k| Ok(Entry::new(vec![k], vec![])));
        let result = SortedRun::from_sorted(spilling(dir.path(), 1), entries);
        assert!(matches!(result, Err(RunError::Unsorted)));
        Ok(())
    }

    #[test]
    fn from_sorted_accepts_equal_keys() -> Result<()> {
        let entries = [1u8, 1, 1].map(|k| Ok(Entry::new(vec![k], vec![])));
        let run = SortedRun::from_sorted(Arc::new(RunConfig::in_memory()), entries)?;
        assert_eq!(run.len(), 3);
        Ok(())
    }
}
