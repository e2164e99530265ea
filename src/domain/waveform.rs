/// Decoded PCM audio, stored planar: one `Vec<f32>` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaveformError {
    #[error("waveform has no channels")]
    NoChannels,
    #[error("sample rate must be positive")]
    ZeroSampleRate,
    #[error("channel {channel} has {found} frames, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        found: usize,
    },
}

impl Waveform {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, WaveformError> {
        if sample_rate == 0 {
            return Err(WaveformError::ZeroSampleRate);
        }
        let expected = channels.first().ok_or(WaveformError::NoChannels)?.len();
        if let Some((channel, found)) = channels
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != expected)
        {
            return Err(WaveformError::RaggedChannels {
                channel,
                expected,
                found,
            });
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Splits interleaved samples into channels. Trailing samples that do not
    /// fill a whole frame are dropped.
    pub fn from_interleaved(
        sample_rate: u32,
        num_channels: usize,
        samples: &[f32],
    ) -> Result<Self, WaveformError> {
        if num_channels == 0 {
            return Err(WaveformError::NoChannels);
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration_secs(&self) -> f32 {
        self.num_frames() as f32 / self.sample_rate as f32
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Mono is duplicated to both sides; anything wider keeps the first two
    /// channels.
    pub fn to_stereo(&self) -> Waveform {
        let channels = match self.channels.as_slice() {
            [mono] => vec![mono.clone(), mono.clone()],
            [left, right, ..] => vec![left.clone(), right.clone()],
            [] => unreachable!("waveform always has at least one channel"),
        };
        Waveform {
            sample_rate: self.sample_rate,
            channels,
        }
    }

    pub fn interleaved(&self) -> Vec<f32> {
        let num_channels = self.num_channels();
        let mut out = Vec::with_capacity(self.num_frames() * num_channels);
        for i in 0..self.num_frames() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }
}
