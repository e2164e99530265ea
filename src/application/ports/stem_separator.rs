use crate::domain::{StemTarget, Waveform};

/// A loaded model that extracts one stem from a mixture.
///
/// Implementations are shared between requests and must be safe to call
/// concurrently through `&self`.
pub trait StemSeparator: Send + Sync {
    fn target(&self) -> StemTarget;

    /// Rate of the waveform returned by [`StemSeparator::separate`].
    fn sample_rate(&self) -> u32;

    fn separate(&self, mixture: &Waveform) -> Result<Waveform, SeparationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SeparationError {
    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),
    #[error("resampling failed: {0}")]
    ResampleFailed(String),
    #[error("spectral transform failed: {0}")]
    TransformFailed(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<candle_core::Error> for SeparationError {
    fn from(e: candle_core::Error) -> Self {
        Self::InferenceFailed(e.to_string())
    }
}
