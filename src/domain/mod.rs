mod stem_target;
mod uploaded_audio;
mod waveform;

pub use stem_target::{StemTarget, UnknownTarget};
pub use uploaded_audio::UploadedAudio;
pub use waveform::{Waveform, WaveformError};
