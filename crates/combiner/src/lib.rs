//! # Combiner
//!
//! A combine function that turns an unordered collection of values into one
//! sequence ordered by a key derived from each value.
//!
//! Work follows the usual accumulate/merge/extract protocol of a combine:
//! every partition folds its values into an [`Accumulator`], accumulators are
//! merged in any grouping and any order, and the final accumulator is
//! extracted into the sorted output. The result does not depend on how the
//! input was partitioned or in which order accumulators were merged.
//!
//! ## Key properties
//! - **Bounded memory**: values are stored as encoded key/value bytes in
//!   [`sortedrun::SortedRun`]s that spill to temporary files past a budget.
//! - **Lazy merging**: merging accumulators only collects their runs; the
//!   k-way merge happens once, when the output is read.
//! - **Lazy decoding**: the output iterator decodes one value per `next`.
//! - **Checkpointable**: [`AccumulatorCoder`] serializes any accumulator.
//!
//! ## Example
//! ```rust
//! use codec::{U32Codec, U64Codec};
//! use combiner::{LocalRunner, SortingCombiner};
//!
//! let comb = SortingCombiner::new(U32Codec, U64Codec, |v: &u32| u64::from(*v));
//! let sorted = LocalRunner::new(2, 2)
//!     .combine_globally(&comb, vec![5u32, 3, 9, 1])
//!     .unwrap();
//! let out: Vec<u32> = sorted.map(Result::unwrap).collect();
//! assert_eq!(out, vec![1, 3, 5, 9]);
//! ```

mod accumulator;
mod coder;
mod combiner;
mod error;
mod local;

pub use accumulator::{Accumulator, MergedRuns};
pub use coder::AccumulatorCoder;
pub use combiner::{SortedValues, SortingCombiner};
pub use error::CombineError;
pub use local::{LocalRunner, DEFAULT_BUNDLE_SIZE, DEFAULT_FANOUT};
pub use sortedrun::RunConfig;

/// The accumulate/merge/extract protocol of a combine.
///
/// Implementations must give the same output for every way of splitting the
/// input into accumulators and every order of merging them.
pub trait CombineFn<In> {
    type Accumulator;
    type Output;
    type Error;

    fn create_accumulator(&self) -> Self::Accumulator;

    fn add_input(&self, acc: &mut Self::Accumulator, input: &In) -> Result<(), Self::Error>;

    /// Merges accumulators into one. An empty input yields an empty
    /// accumulator.
    fn merge_accumulators<I>(&self, accumulators: I) -> Self::Accumulator
    where
        I: IntoIterator<Item = Self::Accumulator>;

    fn extract_output(&self, acc: Self::Accumulator) -> Self::Output;
}
