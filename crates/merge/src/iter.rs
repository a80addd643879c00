use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::iter::FusedIterator;

use log::trace;

use crate::entry::{compare_keys, Entry};

/// Buffered head entry of one source.
struct Head {
    entry: Entry,
    source: usize,
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head {}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_keys(&self.entry.key, &other.entry.key).then(self.source.cmp(&other.source))
    }
}

/// Lazy k-way merge over sources of key-ordered entries.
///
/// Each source must yield `Result<Entry, E>` in non-decreasing key order.
/// The merge holds one head entry per live source in a binary min-heap, so
/// memory is O(number of sources) no matter how long the sources are.
///
/// # Laziness
///
/// Construction never touches a source. The first `next` call primes one
/// head from every source; afterwards each call refills only the source the
/// previous entry came from, and only when the caller asks for the next
/// entry. Exhausted sources are dropped as soon as they report `None`.
///
/// # Ties
///
/// Entries with equal keys are all emitted. Among them, the source with the
/// lower index goes first. Callers should not rely on this.
///
/// # Errors
///
/// The first error from any source is returned as `Some(Err(_))`; the merge
/// is then finished and every later call returns `None`.
pub struct MergeIter<I> {
    sources: Vec<Option<I>>,
    heap: BinaryHeap<Reverse<Head>>,
    /// Source whose head was handed out last and must be refilled.
    refill: Option<usize>,
    primed: bool,
    done: bool,
}

impl<I, E> MergeIter<I>
where
    I: Iterator<Item = Result<Entry, E>>,
{
    /// Creates a merge over `sources`. No source is read yet.
    pub fn new<S>(sources: S) -> Self
    where
        S: IntoIterator<Item = I>,
    {
        let sources: Vec<Option<I>> = sources.into_iter().map(Some).collect();
        Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            refill: None,
            primed: false,
            done: false,
        }
    }

    /// Number of sources that have not yet reported exhaustion.
    pub fn live_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    /// Pulls the next entry of source `idx` into the heap, dropping the
    /// source when it is exhausted.
    fn pull(&mut self, idx: usize) -> Result<(), E> {
        let Some(source) = self.sources[idx].as_mut() else {
            return Ok(());
        };
        match source.next() {
            Some(Ok(entry)) => {
                self.heap.push(Reverse(Head { entry, source: idx }));
                Ok(())
            }
            Some(Err(e)) => {
                self.sources[idx] = None;
                Err(e)
            }
            None => {
                self.sources[idx] = None;
                Ok(())
            }
        }
    }

    fn prime(&mut self) -> Result<(), E> {
        trace!("priming merge over {} sources", self.sources.len());
        for idx in 0..self.sources.len() {
            self.pull(idx)?;
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.done = true;
        self.heap.clear();
        self.sources.clear();
        self.refill = None;
    }
}

impl<I, E> Iterator for MergeIter<I>
where
    I: Iterator<Item = Result<Entry, E>>,
{
    type Item = Result<Entry, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let step = if !self.primed {
            self.primed = true;
            self.prime()
        } else if let Some(idx) = self.refill.take() {
            self.pull(idx)
        } else {
            Ok(())
        };
        if let Err(e) = step {
            self.finish();
            return Some(Err(e));
        }

        match self.heap.pop() {
            Some(Reverse(head)) => {
                self.refill = Some(head.source);
                Some(Ok(head.entry))
            }
            None => {
                self.finish();
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // A source error may cut the merge short, so there is no lower bound.
        if self.done {
            (0, Some(0))
        } else {
            (0, None)
        }
    }
}

impl<I, E> FusedIterator for MergeIter<I> where I: Iterator<Item = Result<Entry, E>> {}
