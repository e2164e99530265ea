use unmixer::domain::Waveform;
use unmixer::infrastructure::audio::resample;

use crate::helpers::sine;

#[test]
fn given_matching_rate_when_resampling_then_returns_identical_audio() {
    let waveform = Waveform::new(44_100, vec![sine(440.0, 44_100, 1_000)]).unwrap();

    let resampled = resample(&waveform, 44_100).unwrap();

    assert_eq!(resampled, waveform);
}

#[test]
fn given_half_rate_when_resampling_then_length_halves_and_channels_stay() {
    let left = sine(440.0, 44_100, 4_410);
    let right = sine(220.0, 44_100, 4_410);
    let waveform = Waveform::new(44_100, vec![left, right]).unwrap();

    let resampled = resample(&waveform, 22_050).unwrap();

    assert_eq!(resampled.sample_rate(), 22_050);
    assert_eq!(resampled.num_channels(), 2);
    assert_eq!(resampled.num_frames(), 2_205);
}

#[test]
fn given_upsampling_when_resampling_then_tone_energy_is_preserved() {
    let waveform = Waveform::new(22_050, vec![sine(440.0, 22_050, 22_050)]).unwrap();

    let resampled = resample(&waveform, 44_100).unwrap();

    assert_eq!(resampled.num_frames(), 44_100);
    let rms = |s: &[f32]| (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt();
    let middle = &resampled.channel(0)[4_410..39_690];
    let expected = rms(&waveform.channel(0)[2_205..19_845]);
    assert!((rms(middle) - expected).abs() < 0.02);
}
