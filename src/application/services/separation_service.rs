use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tempfile::NamedTempFile;
use tokio::sync::Semaphore;

use crate::application::ports::{
    AudioDecoder, AudioDecoderError, AudioEncoder, AudioEncoderError, SeparationError,
    StemSeparator,
};
use crate::application::services::ModelRegistry;
use crate::domain::{StemTarget, UploadedAudio, Waveform};

/// Where uploads are staged and separated stems are written.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub persist_output: bool,
}

#[derive(Debug, Clone)]
pub struct SeparatedStem {
    pub target: StemTarget,
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub content_type: &'static str,
    pub data: Vec<u8>,
    pub output_path: Option<PathBuf>,
}

pub struct SeparationService {
    registry: ModelRegistry,
    decoder: Arc<dyn AudioDecoder>,
    encoder: Arc<dyn AudioEncoder>,
    storage: StorageOptions,
    permits: Arc<Semaphore>,
}

impl SeparationService {
    pub fn new(
        registry: ModelRegistry,
        decoder: Arc<dyn AudioDecoder>,
        encoder: Arc<dyn AudioEncoder>,
        storage: StorageOptions,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            registry,
            decoder,
            encoder,
            storage,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &StorageOptions {
        &self.storage
    }

    /// Runs one upload through decode, separation and encode.
    ///
    /// The upload is staged in a temporary file under `upload_dir`; that file
    /// is gone by the time this returns, whether the pipeline succeeded or not.
    pub async fn separate(
        &self,
        target: StemTarget,
        upload: UploadedAudio,
    ) -> Result<SeparatedStem, SeparationServiceError> {
        if upload.is_empty() {
            return Err(SeparationServiceError::EmptyUpload);
        }
        let separator = self
            .registry
            .get(target)
            .ok_or(SeparationServiceError::ModelUnavailable(target))?;

        // Owned so the permit is held by the blocking task, which keeps running
        // even if the caller's future is dropped.
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| SeparationServiceError::TaskFailed(e.to_string()))?;

        let decoder = Arc::clone(&self.decoder);
        let encoder = Arc::clone(&self.encoder);
        let storage = self.storage.clone();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run_pipeline(
                &storage,
                target,
                &upload,
                decoder.as_ref(),
                separator.as_ref(),
                encoder.as_ref(),
            )
        })
        .await
        .map_err(|e| SeparationServiceError::TaskFailed(e.to_string()))?
    }
}

fn run_pipeline(
    storage: &StorageOptions,
    target: StemTarget,
    upload: &UploadedAudio,
    decoder: &dyn AudioDecoder,
    separator: &dyn StemSeparator,
    encoder: &dyn AudioEncoder,
) -> Result<SeparatedStem, SeparationServiceError> {
    let started = Instant::now();

    let mixture = decode_upload(&storage.upload_dir, upload, decoder)?;
    tracing::debug!(
        channels = mixture.num_channels(),
        sample_rate = mixture.sample_rate(),
        duration_secs = mixture.duration_secs(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Upload decoded"
    );

    let stem = separator.separate(&mixture)?;
    tracing::debug!(
        stem = %target,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Stem separated"
    );

    let data = encoder.encode(&stem)?;

    let output_path = if storage.persist_output {
        Some(persist_output(&storage.output_dir, target, &data)?)
    } else {
        None
    };

    tracing::info!(
        stem = %target,
        input_bytes = upload.len(),
        output_bytes = data.len(),
        duration_secs = stem.duration_secs(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Separation completed"
    );

    Ok(SeparatedStem {
        target,
        sample_rate: stem.sample_rate(),
        channels: stem.num_channels(),
        frames: stem.num_frames(),
        content_type: encoder.content_type(),
        data,
        output_path,
    })
}

fn decode_upload(
    upload_dir: &Path,
    upload: &UploadedAudio,
    decoder: &dyn AudioDecoder,
) -> Result<Waveform, SeparationServiceError> {
    let mut staged = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{}", upload.extension()))
        .tempfile_in(upload_dir)?;
    staged.write_all(&upload.data)?;
    staged.flush()?;

    // On error the early return drops `staged`, which deletes the file.
    let mixture = decoder.decode(staged.path())?;
    staged.close()?;

    Ok(mixture)
}

/// Replaces `separated_{target}.wav` atomically so concurrent requests for the
/// same target never leave a partially written file behind.
fn persist_output(output_dir: &Path, target: StemTarget, data: &[u8]) -> io::Result<PathBuf> {
    let path = output_dir.join(target.output_file_name());
    let mut staged = NamedTempFile::new_in(output_dir)?;
    staged.write_all(data)?;
    staged.flush()?;
    staged.persist(&path).map_err(|e| e.error)?;
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum SeparationServiceError {
    #[error("uploaded file is empty")]
    EmptyUpload,
    #[error("no model loaded for target: {0}")]
    ModelUnavailable(StemTarget),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("decoding: {0}")]
    Decoding(#[from] AudioDecoderError),
    #[error("separation: {0}")]
    Separation(#[from] SeparationError),
    #[error("encoding: {0}")]
    Encoding(#[from] AudioEncoderError),
    #[error("separation task failed: {0}")]
    TaskFailed(String),
}
