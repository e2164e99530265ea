use candle_core::Tensor;
use realfft::num_complex::Complex;

use crate::application::ports::{SeparationError, StemSeparator};
use crate::domain::{StemTarget, Waveform};
use crate::infrastructure::audio::resample;

use super::open_unmix::OpenUnmix;
use super::stft::{Spectrogram, Stft};
use super::wiener::{SpectralGrid, WienerConfig, wiener};

/// Extracts one stem with an Open-Unmix network followed by Wiener filtering.
pub struct UnmixSeparator {
    target: StemTarget,
    network: OpenUnmix,
    stft: Stft,
    wiener: WienerConfig,
    sample_rate: u32,
}

impl UnmixSeparator {
    pub fn new(
        target: StemTarget,
        network: OpenUnmix,
        stft: Stft,
        wiener: WienerConfig,
        sample_rate: u32,
    ) -> Result<Self, SeparationError> {
        let config = network.config();
        if stft.num_bins() != config.nb_bins {
            return Err(SeparationError::ModelLoadFailed(format!(
                "network expects {} bins but the STFT produces {}",
                config.nb_bins,
                stft.num_bins()
            )));
        }
        if !(1..=2).contains(&config.nb_channels) {
            return Err(SeparationError::ModelLoadFailed(format!(
                "unsupported channel count: {}",
                config.nb_channels
            )));
        }

        Ok(Self {
            target,
            network,
            stft,
            wiener,
            sample_rate,
        })
    }

    /// Matches the network's channel layout and sample rate.
    fn preprocess(&self, mixture: &Waveform) -> Result<Waveform, SeparationError> {
        let shaped = if self.network.config().nb_channels == 2 {
            mixture.to_stereo()
        } else {
            downmix(mixture)?
        };
        resample(&shaped, self.sample_rate)
    }

    fn estimate_magnitude(
        &self,
        mix: &SpectralGrid<Complex<f32>>,
    ) -> Result<SpectralGrid<f32>, SeparationError> {
        let (frames, bins, channels) = (mix.frames(), mix.bins(), mix.channels());

        let mut magnitude = Vec::with_capacity(frames * channels * bins);
        for t in 0..frames {
            for c in 0..channels {
                for b in 0..bins {
                    magnitude.push(mix.get(t, b, c).norm());
                }
            }
        }

        let input = Tensor::from_vec(magnitude, (frames, channels, bins), self.network.device())?;
        let estimate = self.network.forward(&input)?.to_vec3::<f32>()?;

        Ok(SpectralGrid::from_fn(frames, bins, channels, |t, b, c| {
            estimate[t][c][b]
        }))
    }
}

impl StemSeparator for UnmixSeparator {
    fn target(&self) -> StemTarget {
        self.target
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn separate(&self, mixture: &Waveform) -> Result<Waveform, SeparationError> {
        if mixture.num_frames() == 0 {
            return Err(SeparationError::InvalidInput("audio has no samples".to_string()));
        }

        let audio = self.preprocess(mixture)?;
        let length = audio.num_frames();

        let spectra = audio
            .channels()
            .iter()
            .map(|channel| self.stft.forward(channel))
            .collect::<Result<Vec<Spectrogram>, _>>()?;

        let frames = spectra[0].len();
        let bins = self.stft.num_bins();
        let channels = spectra.len();
        let mix = SpectralGrid::from_fn(frames, bins, channels, |t, b, c| spectra[c][t][b]);

        let target_magnitude = self.estimate_magnitude(&mix)?;

        let window = match self.wiener.window_frames {
            0 => frames,
            n => n,
        };
        let mut target_stft = SpectralGrid::<Complex<f32>>::zeros(frames, bins, channels);
        let mut pos = 0;
        while pos < frames {
            let end = (pos + window).min(frames);
            let sources = wiener(
                &[target_magnitude.frame_range(pos, end)],
                &mix.frame_range(pos, end),
                &self.wiener,
            )?;
            target_stft.write_frames(pos, &sources[0]);
            pos = end;
        }

        let output = (0..channels)
            .map(|c| {
                let spec: Spectrogram = (0..frames)
                    .map(|t| (0..bins).map(|b| target_stft.get(t, b, c)).collect())
                    .collect();
                self.stft.inverse(&spec, length)
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            stem = %self.target,
            frames,
            bins,
            channels,
            "Stem reconstructed"
        );

        Waveform::new(self.sample_rate, output)
            .map_err(|e| SeparationError::InferenceFailed(e.to_string()))
    }
}

fn downmix(waveform: &Waveform) -> Result<Waveform, SeparationError> {
    let scale = 1.0 / waveform.num_channels() as f32;
    let mono = (0..waveform.num_frames())
        .map(|i| waveform.channels().iter().map(|c| c[i]).sum::<f32>() * scale)
        .collect();
    Waveform::new(waveform.sample_rate(), vec![mono])
        .map_err(|e| SeparationError::InvalidInput(e.to_string()))
}
