use sortedrun::{RunCoder, RunConfig, RunError};
use std::io::{Read, Write};
use std::sync::Arc;

use crate::accumulator::Accumulator;

/// Serializes accumulators for checkpointing.
///
/// The wire form is the [`RunCoder`] stream of the accumulator's sorted
/// replay, so a merged accumulator is written as a single run. Decoding
/// yields a `Filling` accumulator whose run is already sorted.
#[derive(Debug, Clone)]
pub struct AccumulatorCoder {
    config: Arc<RunConfig>,
}

impl AccumulatorCoder {
    pub fn new(config: Arc<RunConfig>) -> Self {
        Self { config }
    }

    pub fn encode<W: Write>(&self, acc: &mut Accumulator, w: &mut W) -> Result<(), RunError> {
        let len = acc.len() as u64;
        RunCoder::encode_entries(w, len, acc.replay()?)
    }

    pub fn decode<R: Read>(&self, r: &mut R) -> Result<Accumulator, RunError> {
        let run = RunCoder::decode(r, Arc::clone(&self.config))?;
        Ok(Accumulator::Filling(run))
    }

    /// Encodes into a fresh buffer.
    pub fn encode_to_vec(&self, acc: &mut Accumulator) -> Result<Vec<u8>, RunError> {
        let mut buf = Vec::new();
        self.encode(acc, &mut buf)?;
        Ok(buf)
    }
}
