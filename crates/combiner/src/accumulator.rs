use merge::MergeIter;
use sortedrun::{RunConfig, RunError, RunReplay, SortedRun};
use std::sync::Arc;

/// Partial state of a sorting combine.
///
/// - `Filling`: a single run receiving values one at a time.
/// - `Merged`: the runs of several merged accumulators. The runs are kept as
///   they are; their entries are only merged when the accumulator is
///   replayed, so building a `Merged` accumulator costs O(number of runs).
///
/// Both variants offer the same two capabilities the merge needs:
/// [`is_empty`](Accumulator::is_empty) and sorted
/// [`replay`](Accumulator::replay).
#[derive(Debug, Clone)]
pub enum Accumulator {
    Filling(SortedRun),
    Merged(MergedRuns),
}

/// Runs taken over from merged accumulators.
#[derive(Debug, Clone)]
pub struct MergedRuns {
    config: Arc<RunConfig>,
    runs: Vec<SortedRun>,
}

impl MergedRuns {
    pub(crate) fn new(config: Arc<RunConfig>, runs: Vec<SortedRun>) -> Self {
        Self { config, runs }
    }

    pub fn runs(&self) -> &[SortedRun] {
        &self.runs
    }
}

impl Accumulator {
    /// A new, empty `Filling` accumulator.
    pub fn new(config: Arc<RunConfig>) -> Self {
        Accumulator::Filling(SortedRun::new(config))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Accumulator::Filling(run) => run.is_empty(),
            Accumulator::Merged(m) => m.runs.iter().all(SortedRun::is_empty),
        }
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        match self {
            Accumulator::Filling(run) => run.len(),
            Accumulator::Merged(m) => m.runs.iter().map(SortedRun::len).sum(),
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Accumulator::Merged(_))
    }

    /// Number of runs held.
    pub fn run_count(&self) -> usize {
        match self {
            Accumulator::Filling(_) => 1,
            Accumulator::Merged(m) => m.runs.len(),
        }
    }

    /// Appends one encoded entry.
    ///
    /// A merged accumulator receives it in its last run; a fresh run is
    /// created if it has none.
    pub fn append(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), RunError> {
        match self {
            Accumulator::Filling(run) => run.append(key, value),
            Accumulator::Merged(m) => {
                if m.runs.is_empty() {
                    m.runs.push(SortedRun::new(Arc::clone(&m.config)));
                }
                let last = m.runs.len() - 1;
                m.runs[last].append(key, value)
            }
        }
    }

    /// Replays every entry in ascending key order.
    ///
    /// All segments of all runs are merged by one k-way merge, so a merge of
    /// merges never nests merge iterators.
    pub fn replay(&mut self) -> Result<RunReplay, RunError> {
        match self {
            Accumulator::Filling(run) => run.replay(),
            Accumulator::Merged(m) => {
                let mut cursors = Vec::new();
                for run in m.runs.iter_mut().filter(|r| !r.is_empty()) {
                    cursors.extend(run.cursors()?);
                }
                Ok(MergeIter::new(cursors))
            }
        }
    }

    /// Gives up the runs, dropping empty ones.
    pub(crate) fn into_runs(self) -> Vec<SortedRun> {
        match self {
            Accumulator::Filling(run) if run.is_empty() => Vec::new(),
            Accumulator::Filling(run) => vec![run],
            Accumulator::Merged(m) => m.runs.into_iter().filter(|r| !r.is_empty()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn filled(keys: &[u8]) -> Result<Accumulator> {
        let mut acc = Accumulator::new(Arc::new(RunConfig::in_memory()));
        for k in keys {
            acc.append(vec![*k], vec![*k])?;
        }
        Ok(acc)
    }

    fn merged(parts: &[&[u8]]) -> Result<Accumulator> {
        let runs = parts
            .iter()
            .map(|p| filled(p).map(|a| a.into_runs()))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        Ok(Accumulator::Merged(MergedRuns::new(
            Arc::new(RunConfig::in_memory()),
            runs,
        )))
    }

    fn replay_keys(acc: &mut Accumulator) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for e in acc.replay()? {
            out.push(e?.key[0]);
        }
        Ok(out)
    }

    #[test]
    fn filling_replays_sorted() -> Result<()> {
        let mut acc = filled(&[3, 1, 2])?;
        assert!(!acc.is_merged());
        assert_eq!(acc.run_count(), 1);
        assert_eq!(replay_keys(&mut acc)?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn merged_replays_across_runs() -> Result<()> {
        let mut acc = merged(&[&[3, 1], &[2], &[0, 4]])?;
        assert!(acc.is_merged());
        assert_eq!(acc.run_count(), 3);
        assert_eq!(acc.len(), 5);
        assert_eq!(replay_keys(&mut acc)?, vec![0, 1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn append_to_merged_goes_to_last_run() -> Result<()> {
        let mut acc = merged(&[&[5], &[7]])?;
        acc.append(vec![6], vec![6])?;
        assert_eq!(acc.run_count(), 2);
        assert_eq!(replay_keys(&mut acc)?, vec![5, 6, 7]);
        Ok(())
    }

    #[test]
    fn append_to_runless_merged_creates_run() -> Result<()> {
        let mut acc = merged(&[])?;
        assert!(acc.is_empty());
        acc.append(vec![1], vec![1])?;
        assert_eq!(acc.run_count(), 1);
        assert_eq!(replay_keys(&mut acc)?, vec![1]);
        Ok(())
    }

    #[test]
    fn empty_filling_gives_no_runs() -> Result<()> {
        let acc = filled(&[])?;
        assert!(acc.is_empty());
        assert!(acc.into_runs().is_empty());
        Ok(())
    }
}
