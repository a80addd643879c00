//! In-process driver for a [`CombineFn`].
//!
//! Mimics the shape a distributed runner gives a combine: inputs are split
//! into bundles, each bundle builds its own accumulator (the map-side
//! combine), and the accumulators are merged in rounds of at most `fanout`
//! until one is left (the reduce-side merge).

use log::debug;
use std::collections::BTreeMap;

use crate::CombineFn;

/// Default number of inputs folded into one accumulator.
pub const DEFAULT_BUNDLE_SIZE: usize = 1024;

/// Default maximum number of accumulators merged at once.
pub const DEFAULT_FANOUT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalRunner {
    /// Inputs per accumulator. At least 1.
    pub bundle_size: usize,
    /// Accumulators per merge. At least 2.
    pub fanout: usize,
}

impl LocalRunner {
    pub fn new(bundle_size: usize, fanout: usize) -> Self {
        Self {
            bundle_size: bundle_size.max(1),
            fanout: fanout.max(2),
        }
    }

    /// Combines every input into a single output.
    ///
    /// Empty input still produces an output: the extraction of an empty
    /// accumulator.
    pub fn combine_globally<In, C, I>(&self, comb: &C, inputs: I) -> Result<C::Output, C::Error>
    where
        C: CombineFn<In>,
        I: IntoIterator<Item = In>,
    {
        let mut bundle = Bundle::new::<In, C>(comb);
        for input in inputs {
            bundle.add::<In, C>(comb, &input, self.bundle_size)?;
        }
        let acc = self.reduce::<In, C>(comb, bundle.finish());
        Ok(comb.extract_output(acc))
    }

    /// Combines the inputs of each grouping key separately.
    ///
    /// Keys are compared for equality only; the map orders them for
    /// convenience.
    pub fn combine_per_key<G, In, C, I>(
        &self,
        comb: &C,
        pairs: I,
    ) -> Result<BTreeMap<G, C::Output>, C::Error>
    where
        G: Ord,
        C: CombineFn<In>,
        I: IntoIterator<Item = (G, In)>,
    {
        let mut bundles: BTreeMap<G, Bundle<C::Accumulator>> = BTreeMap::new();
        for (key, input) in pairs {
            bundles
                .entry(key)
                .or_insert_with(|| Bundle::new::<In, C>(comb))
                .add::<In, C>(comb, &input, self.bundle_size)?;
        }

        debug!("combining {} groups", bundles.len());
        Ok(bundles
            .into_iter()
            .map(|(key, bundle)| {
                let acc = self.reduce::<In, C>(comb, bundle.finish());
                (key, comb.extract_output(acc))
            })
            .collect())
    }

    /// Merges `accs` in rounds of at most `fanout` until one remains.
    pub fn reduce<In, C>(&self, comb: &C, mut accs: Vec<C::Accumulator>) -> C::Accumulator
    where
        C: CombineFn<In>,
    {
        let mut round = 0;
        while accs.len() > self.fanout {
            round += 1;
            let mut next = Vec::with_capacity(accs.len().div_ceil(self.fanout));
            let mut it = accs.into_iter().peekable();
            while it.peek().is_some() {
                let group: Vec<_> = it.by_ref().take(self.fanout).collect();
                next.push(comb.merge_accumulators(group));
            }
            debug!("merge round {} left {} accumulators", round, next.len());
            accs = next;
        }
        comb.merge_accumulators(accs)
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new(DEFAULT_BUNDLE_SIZE, DEFAULT_FANOUT)
    }
}

/// Finished accumulators plus the one currently being filled.
struct Bundle<A> {
    done: Vec<A>,
    current: A,
    count: usize,
}

impl<A> Bundle<A> {
    fn new<In, C>(comb: &C) -> Self
    where
        C: CombineFn<In, Accumulator = A>,
    {
        Self {
            done: Vec::new(),
            current: comb.create_accumulator(),
            count: 0,
        }
    }

    fn add<In, C>(&mut self, comb: &C, input: &In, bundle_size: usize) -> Result<(), C::Error>
    where
        C: CombineFn<In, Accumulator = A>,
    {
        comb.add_input(&mut self.current, input)?;
        self.count += 1;
        if self.count >= bundle_size {
            let full = std::mem::replace(&mut self.current, comb.create_accumulator());
            self.done.push(full);
            self.count = 0;
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<A> {
        if self.count > 0 {
            self.done.push(self.current);
        }
        self.done
    }
}
