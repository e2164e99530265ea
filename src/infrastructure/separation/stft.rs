use std::f32::consts::PI;
use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::application::ports::SeparationError;

/// Complex spectrum of one channel, indexed `[frame][bin]`.
pub type Spectrogram = Vec<Vec<Complex<f32>>>;

const WINDOW_SUM_FLOOR: f32 = 1e-11;

/// Short-time Fourier transform with a periodic Hann window and centred
/// frames (the signal is reflect-padded by `n_fft / 2` on both sides).
/// The forward transform is unnormalised.
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Result<Self, SeparationError> {
        if n_fft < 2 || n_fft % 2 != 0 {
            return Err(SeparationError::InvalidInput(format!(
                "n_fft must be even and at least 2, got {}",
                n_fft
            )));
        }
        if hop == 0 || hop > n_fft {
            return Err(SeparationError::InvalidInput(format!(
                "hop must be in 1..={}, got {}",
                n_fft, hop
            )));
        }

        let window = (0..n_fft)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n_fft as f32).cos()))
            .collect();

        let mut planner = RealFftPlanner::<f32>::new();
        Ok(Self {
            n_fft,
            hop,
            window,
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        })
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub fn num_frames(&self, length: usize) -> usize {
        1 + length / self.hop
    }

    pub fn forward(&self, signal: &[f32]) -> Result<Spectrogram, SeparationError> {
        let pad = self.n_fft / 2;
        let padded: Vec<f32> = (0..signal.len() + 2 * pad)
            .map(|i| {
                if signal.is_empty() {
                    0.0
                } else {
                    signal[reflect_index(i as isize - pad as isize, signal.len())]
                }
            })
            .collect();

        let num_frames = self.num_frames(signal.len());
        let mut frames = Vec::with_capacity(num_frames);
        let mut scratch = self.forward.make_scratch_vec();
        let mut frame_buf = self.forward.make_input_vec();
        let mut spectrum = self.forward.make_output_vec();

        for t in 0..num_frames {
            let start = t * self.hop;
            for (i, sample) in frame_buf.iter_mut().enumerate() {
                *sample = padded[start + i] * self.window[i];
            }
            self.forward
                .process_with_scratch(&mut frame_buf, &mut spectrum, &mut scratch)
                .map_err(|e| SeparationError::TransformFailed(format!("fft: {:?}", e)))?;
            frames.push(spectrum.clone());
        }

        Ok(frames)
    }

    /// Overlap-adds the frames back and returns exactly `length` samples.
    pub fn inverse(&self, spec: &Spectrogram, length: usize) -> Result<Vec<f32>, SeparationError> {
        if spec.is_empty() {
            return Ok(vec![0.0; length]);
        }

        let num_bins = self.num_bins();
        let output_len = self.n_fft + self.hop * (spec.len() - 1);
        let mut output = vec![0.0f32; output_len];
        let mut window_sum = vec![0.0f32; output_len];

        let mut scratch = self.inverse.make_scratch_vec();
        let mut spectrum = self.inverse.make_input_vec();
        let mut frame_buf = self.inverse.make_output_vec();
        let scale = 1.0 / self.n_fft as f32;

        for (t, frame) in spec.iter().enumerate() {
            if frame.len() != num_bins {
                return Err(SeparationError::TransformFailed(format!(
                    "frame {} has {} bins, expected {}",
                    t,
                    frame.len(),
                    num_bins
                )));
            }
            spectrum.copy_from_slice(frame);
            // A real signal has no imaginary part at DC and Nyquist.
            spectrum[0].im = 0.0;
            spectrum[num_bins - 1].im = 0.0;

            self.inverse
                .process_with_scratch(&mut spectrum, &mut frame_buf, &mut scratch)
                .map_err(|e| SeparationError::TransformFailed(format!("ifft: {:?}", e)))?;

            let start = t * self.hop;
            for (i, &sample) in frame_buf.iter().enumerate() {
                output[start + i] += sample * scale * self.window[i];
                window_sum[start + i] += self.window[i] * self.window[i];
            }
        }

        for (sample, &norm) in output.iter_mut().zip(&window_sum) {
            if norm > WINDOW_SUM_FLOOR {
                *sample /= norm;
            }
        }

        let pad = self.n_fft / 2;
        let mut signal: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
        signal.resize(length, 0.0);
        Ok(signal)
    }
}

/// Mirror-reflects an out-of-range index back into `0..len`, bouncing as many
/// times as needed for very short signals.
fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m >= len as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}
