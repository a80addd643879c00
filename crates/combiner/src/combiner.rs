use codec::Codec;
use log::debug;
use sortedrun::{RunConfig, RunReplay};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::accumulator::{Accumulator, MergedRuns};
use crate::coder::AccumulatorCoder;
use crate::error::CombineError;
use crate::CombineFn;

/// Combines values into a sequence ordered by a derived sort key.
///
/// `sort_key_fn` derives the key, `key_codec` must encode keys so that their
/// byte order matches the key order, and `value_codec` only has to
/// round-trip. Keys are dropped from the output.
///
/// # Example
/// ```rust
/// use codec::{I64Codec, StringCodec};
/// use combiner::SortingCombiner;
///
/// let comb = SortingCombiner::new(StringCodec, I64Codec, |s: &String| s.len() as i64);
///
/// let mut a = comb.create_accumulator();
/// comb.add_input(&mut a, &"ccc".to_string()).unwrap();
/// comb.add_input(&mut a, &"a".to_string()).unwrap();
/// let mut b = comb.create_accumulator();
/// comb.add_input(&mut b, &"bb".to_string()).unwrap();
///
/// let merged = comb.merge_accumulators([a, b]);
/// let out: Vec<String> = comb.extract_output(merged).map(Result::unwrap).collect();
/// assert_eq!(out, ["a", "bb", "ccc"]);
/// ```
pub struct SortingCombiner<V, K, F, VC, KC> {
    value_codec: VC,
    key_codec: KC,
    sort_key_fn: F,
    config: Arc<RunConfig>,
    _types: PhantomData<fn(&V) -> K>,
}

impl<V, K, F, VC, KC> SortingCombiner<V, K, F, VC, KC>
where
    F: Fn(&V) -> K,
    VC: Codec<V> + Clone,
    KC: Codec<K>,
{
    /// Creates a combiner with the default [`RunConfig`].
    pub fn new(value_codec: VC, key_codec: KC, sort_key_fn: F) -> Self {
        Self {
            value_codec,
            key_codec,
            sort_key_fn,
            config: Arc::new(RunConfig::default()),
            _types: PhantomData,
        }
    }

    /// Sets the config used by every run this combiner creates.
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Coder for checkpointing accumulators of this combiner.
    pub fn accumulator_coder(&self) -> AccumulatorCoder {
        AccumulatorCoder::new(Arc::clone(&self.config))
    }

    /// Returns a new, empty accumulator.
    pub fn create_accumulator(&self) -> Accumulator {
        Accumulator::new(Arc::clone(&self.config))
    }

    /// Derives the sort key of `value`, encodes both and appends them.
    ///
    /// # Errors
    ///
    /// [`CombineError::Encoding`] if either codec rejects its input; nothing is
    /// appended in that case. [`CombineError::Run`] if a spill fails.
    pub fn add_input(&self, acc: &mut Accumulator, value: &V) -> Result<(), CombineError> {
        let key = (self.sort_key_fn)(value);
        let key_bytes = self
            .key_codec
            .encode_to_vec(&key)
            .map_err(CombineError::Encoding)?;
        let value_bytes = self
            .value_codec
            .encode_to_vec(value)
            .map_err(CombineError::Encoding)?;
        acc.append(key_bytes, value_bytes)?;
        Ok(())
    }

    /// Merges any number of accumulators into one.
    ///
    /// Empty inputs are dropped. With no input left the result is a new empty
    /// accumulator; with one it is that accumulator unchanged. Otherwise the
    /// runs of all inputs move into one `Merged` accumulator without reading
    /// any entry.
    pub fn merge_accumulators<I>(&self, accumulators: I) -> Accumulator
    where
        I: IntoIterator<Item = Accumulator>,
    {
        let mut inputs: Vec<Accumulator> = accumulators
            .into_iter()
            .filter(|a| !a.is_empty())
            .collect();

        match inputs.len() {
            0 => self.create_accumulator(),
            1 => inputs.pop().unwrap_or_else(|| self.create_accumulator()),
            n => {
                let runs: Vec<_> = inputs.into_iter().flat_map(Accumulator::into_runs).collect();
                debug!("merged {} accumulators into {} runs", n, runs.len());
                Accumulator::Merged(MergedRuns::new(Arc::clone(&self.config), runs))
            }
        }
    }

    /// Returns the values of `acc` in sort-key order.
    ///
    /// Nothing is read here. The accumulator is replayed on the first call to
    /// `next`, and each value is decoded when it is reached.
    pub fn extract_output(&self, acc: Accumulator) -> SortedValues<V, VC> {
        SortedValues {
            state: State::Pending(acc),
            codec: self.value_codec.clone(),
            _value: PhantomData,
        }
    }
}

impl<V, K, F, VC, KC> CombineFn<V> for SortingCombiner<V, K, F, VC, KC>
where
    F: Fn(&V) -> K,
    VC: Codec<V> + Clone,
    KC: Codec<K>,
{
    type Accumulator = Accumulator;
    type Output = SortedValues<V, VC>;
    type Error = CombineError;

    fn create_accumulator(&self) -> Accumulator {
        SortingCombiner::create_accumulator(self)
    }

    fn add_input(&self, acc: &mut Accumulator, input: &V) -> Result<(), CombineError> {
        SortingCombiner::add_input(self, acc, input)
    }

    fn merge_accumulators<I>(&self, accumulators: I) -> Accumulator
    where
        I: IntoIterator<Item = Accumulator>,
    {
        SortingCombiner::merge_accumulators(self, accumulators)
    }

    fn extract_output(&self, acc: Accumulator) -> SortedValues<V, VC> {
        SortingCombiner::extract_output(self, acc)
    }
}

enum State {
    Pending(Accumulator),
    /// The accumulator is kept alive so its spill files outlive the replay.
    Streaming(RunReplay, Accumulator),
    Done,
}

/// Single-pass iterator over the decoded output of one accumulator.
///
/// The first error, whether from replaying the runs or from decoding a
/// value, is yielded once; the iterator is finished afterwards.
pub struct SortedValues<V, C> {
    state: State,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C: Codec<V>> Iterator for SortedValues<V, C> {
    type Item = Result<V, CombineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Done) {
                State::Done => return None,
                State::Pending(mut acc) => match acc.replay() {
                    Ok(replay) => self.state = State::Streaming(replay, acc),
                    Err(e) => return Some(Err(e.into())),
                },
                State::Streaming(mut replay, acc) => {
                    return match replay.next()? {
                        Ok(entry) => match self.codec.decode(&entry.value) {
                            Ok(value) => {
                                self.state = State::Streaming(replay, acc);
                                Some(Ok(value))
                            }
                            Err(e) => Some(Err(CombineError::Decoding(e))),
                        },
                        Err(e) => Some(Err(e.into())),
                    };
                }
            }
        }
    }
}

impl<V, C: Codec<V>> FusedIterator for SortedValues<V, C> {}
