use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::application::ports::{AudioEncoder, AudioEncoderError};
use crate::domain::Waveform;

/// Writes 32-bit IEEE float WAV into memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavEncoder;

impl AudioEncoder for WavEncoder {
    fn content_type(&self) -> &'static str {
        "audio/wav"
    }

    fn encode(&self, waveform: &Waveform) -> Result<Vec<u8>, AudioEncoderError> {
        let channels = u16::try_from(waveform.num_channels()).map_err(|_| {
            AudioEncoderError::EncodingFailed(format!(
                "too many channels: {}",
                waveform.num_channels()
            ))
        })?;
        let spec = WavSpec {
            channels,
            sample_rate: waveform.sample_rate(),
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)
                .map_err(|e| AudioEncoderError::EncodingFailed(e.to_string()))?;
            for sample in waveform.interleaved() {
                writer
                    .write_sample(sample)
                    .map_err(|e| AudioEncoderError::EncodingFailed(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| AudioEncoderError::EncodingFailed(e.to_string()))?;
        }

        Ok(cursor.into_inner())
    }
}
