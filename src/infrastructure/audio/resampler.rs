use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::application::ports::SeparationError;
use crate::domain::Waveform;

const CHUNK_SIZE: usize = 1024;

/// Converts `waveform` to `to_rate` with a band-limited sinc resampler.
/// Returns a copy when the rates already match.
pub fn resample(waveform: &Waveform, to_rate: u32) -> Result<Waveform, SeparationError> {
    let from_rate = waveform.sample_rate();
    if from_rate == to_rate {
        return Ok(waveform.clone());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let num_channels = waveform.num_channels();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, num_channels)
        .map_err(|e| SeparationError::ResampleFailed(format!("resampler init: {}", e)))?;

    let expected_len = (waveform.num_frames() as f64 * ratio).round() as usize;
    let mut output: Vec<Vec<f32>> =
        vec![Vec::with_capacity(expected_len + CHUNK_SIZE); num_channels];

    // Feed one extra chunk of silence so the filter delay is flushed out.
    let padded_frames = waveform.num_frames() + CHUNK_SIZE;
    let mut start = 0;
    while start < padded_frames {
        let input: Vec<Vec<f32>> = waveform
            .channels()
            .iter()
            .map(|channel| {
                let mut block = vec![0.0f32; CHUNK_SIZE];
                if start < channel.len() {
                    let end = (start + CHUNK_SIZE).min(channel.len());
                    block[..end - start].copy_from_slice(&channel[start..end]);
                }
                block
            })
            .collect();

        let result = resampler
            .process(&input, None)
            .map_err(|e| SeparationError::ResampleFailed(format!("resample: {}", e)))?;

        for (out, block) in output.iter_mut().zip(result) {
            out.extend_from_slice(&block);
        }
        start += CHUNK_SIZE;
    }

    let delay = resampler.output_delay();
    let channels = output
        .into_iter()
        .map(|channel| {
            let mut aligned: Vec<f32> = channel.into_iter().skip(delay).collect();
            aligned.resize(expected_len, 0.0);
            aligned
        })
        .collect();

    tracing::debug!(from_rate, to_rate, frames = expected_len, "Audio resampled");

    Waveform::new(to_rate, channels).map_err(|e| SeparationError::ResampleFailed(e.to_string()))
}
