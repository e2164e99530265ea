mod audio_decoder;
mod audio_encoder;
mod stem_separator;

pub use audio_decoder::{AudioDecoder, AudioDecoderError};
pub use audio_encoder::{AudioEncoder, AudioEncoderError};
pub use stem_separator::{SeparationError, StemSeparator};
