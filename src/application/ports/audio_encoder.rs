use crate::domain::Waveform;

pub trait AudioEncoder: Send + Sync {
    /// MIME type of the bytes produced by [`AudioEncoder::encode`].
    fn content_type(&self) -> &'static str;

    fn encode(&self, waveform: &Waveform) -> Result<Vec<u8>, AudioEncoderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AudioEncoderError {
    #[error("audio encoding failed: {0}")]
    EncodingFailed(String),
}
