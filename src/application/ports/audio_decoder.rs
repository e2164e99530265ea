use std::path::Path;

use crate::domain::Waveform;

pub trait AudioDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Waveform, AudioDecoderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AudioDecoderError {
    #[error("audio decoding failed: {0}")]
    DecodingFailed(String),
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
