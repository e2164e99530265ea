use std::f32::consts::PI;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use unmixer::application::ports::{SeparationError, StemSeparator};
use unmixer::application::services::{ModelRegistry, SeparationService, StorageOptions};
use unmixer::domain::{StemTarget, Waveform};
use unmixer::infrastructure::audio::{SymphoniaDecoder, WavEncoder};

pub const TEST_SAMPLE_RATE: u32 = 44_100;

/// 16-bit PCM WAV with interleaved `samples`.
pub fn build_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Stereo tone, left and right at different pitches.
pub fn stereo_tone_wav(sample_rate: u32, frames: usize) -> Vec<u8> {
    let mut samples = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        samples.push(((2.0 * PI * 440.0 * t).sin() * 8_000.0) as i16);
        samples.push(((2.0 * PI * 660.0 * t).sin() * 8_000.0) as i16);
    }
    build_wav(sample_rate, 2, &samples)
}

pub fn sine(frequency: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5)
        .collect()
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

/// Halves the mixture; stands in for a real model.
pub struct MockSeparator {
    pub target: StemTarget,
}

impl StemSeparator for MockSeparator {
    fn target(&self) -> StemTarget {
        self.target
    }

    fn sample_rate(&self) -> u32 {
        TEST_SAMPLE_RATE
    }

    fn separate(&self, mixture: &Waveform) -> Result<Waveform, SeparationError> {
        let stereo = mixture.to_stereo();
        let channels = stereo
            .channels()
            .iter()
            .map(|c| c.iter().map(|s| s * 0.5).collect())
            .collect();
        Waveform::new(stereo.sample_rate(), channels)
            .map_err(|e| SeparationError::InferenceFailed(e.to_string()))
    }
}

pub struct FailingSeparator {
    pub target: StemTarget,
}

impl StemSeparator for FailingSeparator {
    fn target(&self) -> StemTarget {
        self.target
    }

    fn sample_rate(&self) -> u32 {
        TEST_SAMPLE_RATE
    }

    fn separate(&self, _mixture: &Waveform) -> Result<Waveform, SeparationError> {
        Err(SeparationError::InferenceFailed("model exploded".to_string()))
    }
}

pub fn mock_registry() -> ModelRegistry {
    StemTarget::ALL
        .into_iter()
        .map(|target| Arc::new(MockSeparator { target }) as Arc<dyn StemSeparator>)
        .collect()
}

pub fn failing_registry() -> ModelRegistry {
    StemTarget::ALL
        .into_iter()
        .map(|target| Arc::new(FailingSeparator { target }) as Arc<dyn StemSeparator>)
        .collect()
}

pub struct TestDirs {
    pub upload: tempfile::TempDir,
    pub output: tempfile::TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        Self {
            upload: tempfile::TempDir::new().unwrap(),
            output: tempfile::TempDir::new().unwrap(),
        }
    }

    pub fn storage(&self, persist_output: bool) -> StorageOptions {
        StorageOptions {
            upload_dir: self.upload.path().to_path_buf(),
            output_dir: self.output.path().to_path_buf(),
            persist_output,
        }
    }
}

pub fn create_service(registry: ModelRegistry, storage: StorageOptions) -> SeparationService {
    create_service_with_jobs(registry, storage, 2)
}

pub fn create_service_with_jobs(
    registry: ModelRegistry,
    storage: StorageOptions,
    max_concurrent_jobs: usize,
) -> SeparationService {
    SeparationService::new(
        registry,
        Arc::new(SymphoniaDecoder),
        Arc::new(WavEncoder),
        storage,
        max_concurrent_jobs,
    )
}
