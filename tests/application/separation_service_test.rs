use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use unmixer::application::ports::{SeparationError, StemSeparator};
use unmixer::application::services::{ModelRegistry, SeparationServiceError};
use unmixer::domain::{StemTarget, UploadedAudio, Waveform};

use crate::helpers::{
    TEST_SAMPLE_RATE, TestDirs, build_wav, create_service, create_service_with_jobs,
    dir_is_empty, failing_registry, mock_registry, stereo_tone_wav,
};

/// Sleeps inside `separate` and records how many calls overlap.
#[derive(Default)]
struct SlowSeparator {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowSeparator {
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl StemSeparator for SlowSeparator {
    fn target(&self) -> StemTarget {
        StemTarget::Vocals
    }

    fn sample_rate(&self) -> u32 {
        TEST_SAMPLE_RATE
    }

    fn separate(&self, mixture: &Waveform) -> Result<Waveform, SeparationError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(300));
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(mixture.to_stereo())
    }
}

fn slow_registry(separator: &Arc<SlowSeparator>) -> ModelRegistry {
    std::iter::once(Arc::clone(separator) as Arc<dyn StemSeparator>).collect()
}

fn wav_upload(frames: usize) -> UploadedAudio {
    UploadedAudio::new(
        Some("mix.wav".to_string()),
        stereo_tone_wav(TEST_SAMPLE_RATE, frames),
    )
}

#[tokio::test]
async fn given_empty_upload_when_separating_then_returns_empty_upload_error() {
    let dirs = TestDirs::new();
    let service = create_service(mock_registry(), dirs.storage(true));

    let result = service
        .separate(StemTarget::Vocals, UploadedAudio::new(None, Vec::new()))
        .await;

    assert!(matches!(result, Err(SeparationServiceError::EmptyUpload)));
    assert!(dir_is_empty(dirs.upload.path()));
}

#[tokio::test]
async fn given_no_model_for_target_when_separating_then_returns_model_unavailable() {
    let dirs = TestDirs::new();
    let service = create_service(ModelRegistry::new(), dirs.storage(true));

    let result = service.separate(StemTarget::Bass, wav_upload(1_000)).await;

    assert!(matches!(
        result,
        Err(SeparationServiceError::ModelUnavailable(StemTarget::Bass))
    ));
}

#[tokio::test]
async fn given_garbage_bytes_when_separating_then_returns_decoding_error_and_cleans_up() {
    let dirs = TestDirs::new();
    let service = create_service(mock_registry(), dirs.storage(true));

    let upload = UploadedAudio::new(
        Some("noise.wav".to_string()),
        b"this is not a wav file".repeat(16),
    );
    let result = service.separate(StemTarget::Vocals, upload).await;

    assert!(matches!(result, Err(SeparationServiceError::Decoding(_))));
    assert!(dir_is_empty(dirs.upload.path()));
    assert!(dir_is_empty(dirs.output.path()));
}

#[tokio::test]
async fn given_failing_model_when_separating_then_returns_separation_error_and_cleans_up() {
    let dirs = TestDirs::new();
    let service = create_service(failing_registry(), dirs.storage(true));

    let result = service.separate(StemTarget::Other, wav_upload(2_000)).await;

    assert!(matches!(result, Err(SeparationServiceError::Separation(_))));
    assert!(dir_is_empty(dirs.upload.path()));
    assert!(dir_is_empty(dirs.output.path()));
}

#[tokio::test]
async fn given_persist_enabled_when_separating_then_output_file_matches_response() {
    let dirs = TestDirs::new();
    let service = create_service(mock_registry(), dirs.storage(true));

    let stem = service
        .separate(StemTarget::Drums, wav_upload(3_000))
        .await
        .unwrap();

    let expected_path = dirs.output.path().join("separated_drums.wav");
    assert_eq!(stem.output_path.as_deref(), Some(expected_path.as_path()));
    assert_eq!(std::fs::read(&expected_path).unwrap(), stem.data);
    assert!(dir_is_empty(dirs.upload.path()));
}

#[tokio::test]
async fn given_persist_disabled_when_separating_then_no_output_file_is_written() {
    let dirs = TestDirs::new();
    let service = create_service(mock_registry(), dirs.storage(false));

    let stem = service
        .separate(StemTarget::Vocals, wav_upload(3_000))
        .await
        .unwrap();

    assert!(stem.output_path.is_none());
    assert!(dir_is_empty(dirs.output.path()));
    assert!(!stem.data.is_empty());
}

#[tokio::test]
async fn given_mono_upload_when_separating_then_stem_is_stereo_with_same_length() {
    let dirs = TestDirs::new();
    let service = create_service(mock_registry(), dirs.storage(false));

    let samples: Vec<i16> = (0..1_500).map(|i| ((i % 100) * 100) as i16).collect();
    let upload = UploadedAudio::new(
        Some("mono.wav".to_string()),
        build_wav(TEST_SAMPLE_RATE, 1, &samples),
    );
    let stem = service.separate(StemTarget::Bass, upload).await.unwrap();

    assert_eq!(stem.target, StemTarget::Bass);
    assert_eq!(stem.channels, 2);
    assert_eq!(stem.frames, 1_500);
    assert_eq!(stem.sample_rate, TEST_SAMPLE_RATE);
    assert_eq!(stem.content_type, "audio/wav");

    let reader = hound::WavReader::new(Cursor::new(stem.data)).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.duration(), 1_500);
}

#[tokio::test]
async fn given_uppercase_extension_when_separating_then_upload_still_decodes() {
    let dirs = TestDirs::new();
    let service = create_service(mock_registry(), dirs.storage(false));

    let upload = UploadedAudio::new(
        Some("Mix.WAV".to_string()),
        stereo_tone_wav(TEST_SAMPLE_RATE, 500),
    );
    let result = service.separate(StemTarget::Vocals, upload).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn given_more_requests_than_jobs_when_separating_then_inference_stays_within_limit() {
    let dirs = TestDirs::new();
    let separator = Arc::new(SlowSeparator::default());
    let service = create_service_with_jobs(slow_registry(&separator), dirs.storage(false), 2);

    let requests = (0..5).map(|_| service.separate(StemTarget::Vocals, wav_upload(500)));
    let results = futures::future::join_all(requests).await;

    assert!(results.iter().all(Result::is_ok));
    assert!(separator.peak() <= 2, "peak was {}", separator.peak());
}

#[tokio::test]
async fn given_cancelled_request_when_next_request_arrives_then_limit_still_holds() {
    let dirs = TestDirs::new();
    let separator = Arc::new(SlowSeparator::default());
    let service = Arc::new(create_service_with_jobs(
        slow_registry(&separator),
        dirs.storage(false),
        1,
    ));

    let first = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.separate(StemTarget::Vocals, wav_upload(500)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    first.abort();
    let _ = first.await;

    let second = service
        .separate(StemTarget::Vocals, wav_upload(500))
        .await;

    assert!(second.is_ok());
    assert_eq!(separator.peak(), 1);
}
