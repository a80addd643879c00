use codec::CodecError;
use sortedrun::RunError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CombineError {
    /// A sort key or value could not be encoded while adding input.
    #[error("encoding input: {0}")]
    Encoding(#[source] CodecError),
    /// A value could not be decoded while reading output.
    #[error("decoding output value: {0}")]
    Decoding(#[source] CodecError),
    #[error("sorted run: {0}")]
    Run(#[from] RunError),
}
