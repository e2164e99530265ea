mod resampler;
mod symphonia_decoder;
mod wav_encoder;

pub use resampler::resample;
pub use symphonia_decoder::SymphoniaDecoder;
pub use wav_encoder::WavEncoder;
