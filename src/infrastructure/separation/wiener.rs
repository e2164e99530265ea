//! Multichannel Wiener post-filter.
//!
//! The network only predicts magnitudes. This stage turns them into complex
//! source spectrograms by borrowing the mixture phase, then refines them with
//! a few rounds of expectation-maximisation over a local Gaussian model: each
//! source gets a per-bin power spectral density `v_j(t, f)` and a per-frequency
//! spatial covariance `R_j(f)`, and the estimates become
//! `y_j = v_j R_j (Σ_k v_k R_k)^-1 x`.

use realfft::num_complex::Complex;

use crate::application::ports::SeparationError;

type C32 = Complex<f32>;
type Mat2 = [[C32; 2]; 2];

const ZERO: C32 = C32 { re: 0.0, im: 0.0 };
const MAX_CHANNELS: usize = 2;

/// Dense `[frame][bin][channel]` array used for spectrogram data.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralGrid<T> {
    frames: usize,
    bins: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> SpectralGrid<T> {
    pub fn zeros(frames: usize, bins: usize, channels: usize) -> Self {
        Self {
            frames,
            bins,
            channels,
            data: vec![T::default(); frames * bins * channels],
        }
    }

    pub fn from_fn(
        frames: usize,
        bins: usize,
        channels: usize,
        mut f: impl FnMut(usize, usize, usize) -> T,
    ) -> Self {
        let mut data = Vec::with_capacity(frames * bins * channels);
        for t in 0..frames {
            for b in 0..bins {
                for c in 0..channels {
                    data.push(f(t, b, c));
                }
            }
        }
        Self {
            frames,
            bins,
            channels,
            data,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.frames, self.bins, self.channels)
    }

    #[inline]
    fn offset(&self, t: usize, b: usize, c: usize) -> usize {
        (t * self.bins + b) * self.channels + c
    }

    #[inline]
    pub fn get(&self, t: usize, b: usize, c: usize) -> T {
        self.data[self.offset(t, b, c)]
    }

    #[inline]
    pub fn set(&mut self, t: usize, b: usize, c: usize, value: T) {
        let i = self.offset(t, b, c);
        self.data[i] = value;
    }

    /// Copy of frames `start..end`.
    pub fn frame_range(&self, start: usize, end: usize) -> Self {
        let stride = self.bins * self.channels;
        Self {
            frames: end - start,
            bins: self.bins,
            channels: self.channels,
            data: self.data[start * stride..end * stride].to_vec(),
        }
    }

    /// Overwrites frames starting at `start` with the contents of `other`.
    pub fn write_frames(&mut self, start: usize, other: &Self) {
        let stride = self.bins * self.channels;
        let begin = start * stride;
        self.data[begin..begin + other.data.len()].copy_from_slice(&other.data);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WienerConfig {
    /// EM rounds. Zero keeps the initial phase-borrowed estimates.
    pub iterations: usize,
    /// Start from ratio masks of the mixture instead of magnitude + mixture phase.
    pub softmask: bool,
    /// Add `mix - Σ targets` as an extra source.
    pub residual: bool,
    /// Frames filtered together; spatial covariances are estimated per window.
    pub window_frames: usize,
    pub eps: f32,
}

impl Default for WienerConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            softmask: false,
            residual: true,
            window_frames: 300,
            eps: 1e-10,
        }
    }
}

const SCALE_FACTOR: f32 = 10.0;

/// Builds complex source estimates from target magnitudes and the mixture.
///
/// Returns one grid per target, plus the residual source last when enabled.
pub fn wiener(
    targets: &[SpectralGrid<f32>],
    mix: &SpectralGrid<C32>,
    config: &WienerConfig,
) -> Result<Vec<SpectralGrid<C32>>, SeparationError> {
    if targets.is_empty() {
        return Err(SeparationError::InvalidInput(
            "wiener filter needs at least one target".to_string(),
        ));
    }
    if let Some(bad) = targets.iter().find(|t| t.shape() != mix.shape()) {
        return Err(SeparationError::InvalidInput(format!(
            "target shape {:?} does not match mixture {:?}",
            bad.shape(),
            mix.shape()
        )));
    }
    if mix.channels == 0 || mix.channels > MAX_CHANNELS {
        return Err(SeparationError::InvalidInput(format!(
            "wiener filter supports 1 or 2 channels, got {}",
            mix.channels
        )));
    }
    let nb_sources = targets.len() + usize::from(config.residual);
    if config.iterations > 0 && nb_sources < 2 {
        return Err(SeparationError::InvalidInput(
            "EM needs at least two sources; enable the residual source".to_string(),
        ));
    }

    let (frames, bins, channels) = mix.shape();
    let mut y: Vec<SpectralGrid<C32>> = if config.softmask {
        targets
            .iter()
            .map(|target| {
                SpectralGrid::from_fn(frames, bins, channels, |t, b, c| {
                    let total: f32 = targets.iter().map(|s| s.get(t, b, c)).sum();
                    mix.get(t, b, c) * (target.get(t, b, c) / (config.eps + total))
                })
            })
            .collect()
    } else {
        targets
            .iter()
            .map(|target| {
                SpectralGrid::from_fn(frames, bins, channels, |t, b, c| {
                    C32::from_polar(target.get(t, b, c), mix.get(t, b, c).arg())
                })
            })
            .collect()
    };

    if config.residual {
        let residual = SpectralGrid::from_fn(frames, bins, channels, |t, b, c| {
            let estimated: C32 = y.iter().map(|s| s.get(t, b, c)).sum();
            mix.get(t, b, c) - estimated
        });
        y.push(residual);
    }

    if config.iterations == 0 {
        return Ok(y);
    }

    let peak = mix.data.iter().map(|z| z.norm()).fold(0.0f32, f32::max);
    let max_abs = (peak / SCALE_FACTOR).max(1.0);

    let mut x = mix.clone();
    scale(&mut x, 1.0 / max_abs);
    for source in &mut y {
        scale(source, 1.0 / max_abs);
    }

    expectation_maximization(&mut y, &x, config.iterations, config.eps);

    for source in &mut y {
        scale(source, max_abs);
    }
    Ok(y)
}

fn scale(grid: &mut SpectralGrid<C32>, factor: f32) {
    for z in &mut grid.data {
        *z *= factor;
    }
}

fn expectation_maximization(
    y: &mut [SpectralGrid<C32>],
    x: &SpectralGrid<C32>,
    iterations: usize,
    eps: f32,
) {
    let (frames, bins, channels) = x.shape();
    let regularization = eps.sqrt();

    for _ in 0..iterations {
        // M step: power spectral densities, then spatial covariances.
        let v: Vec<Vec<f32>> = y
            .iter()
            .map(|source| {
                let mut psd = Vec::with_capacity(frames * bins);
                for t in 0..frames {
                    for b in 0..bins {
                        let power: f32 =
                            (0..channels).map(|c| source.get(t, b, c).norm_sqr()).sum();
                        psd.push(power / channels as f32);
                    }
                }
                psd
            })
            .collect();

        let r: Vec<Vec<Mat2>> = y
            .iter()
            .zip(&v)
            .map(|(source, psd)| {
                (0..bins)
                    .map(|b| {
                        let mut acc: Mat2 = [[ZERO; 2]; 2];
                        let mut weight = eps;
                        for t in 0..frames {
                            for i in 0..channels {
                                for k in 0..channels {
                                    acc[i][k] += source.get(t, b, i) * source.get(t, b, k).conj();
                                }
                            }
                            weight += psd[t * bins + b];
                        }
                        for row in acc.iter_mut() {
                            for z in row.iter_mut() {
                                *z /= weight;
                            }
                        }
                        acc
                    })
                    .collect()
            })
            .collect();

        // E step: multichannel Wiener gains applied to the mixture.
        for t in 0..frames {
            for b in 0..bins {
                let mut cxx: Mat2 = [[ZERO; 2]; 2];
                for (i, row) in cxx.iter_mut().enumerate().take(channels) {
                    row[i] = C32::new(regularization, 0.0);
                }
                for (psd, cov) in v.iter().zip(&r) {
                    let vj = psd[t * bins + b];
                    for i in 0..channels {
                        for k in 0..channels {
                            cxx[i][k] += cov[b][i][k] * vj;
                        }
                    }
                }
                let inv = invert(&cxx, channels);

                for ((source, psd), cov) in y.iter_mut().zip(&v).zip(&r) {
                    let vj = psd[t * bins + b];
                    let mut gain: Mat2 = [[ZERO; 2]; 2];
                    for i in 0..channels {
                        for k in 0..channels {
                            let mut acc = ZERO;
                            for m in 0..channels {
                                acc += cov[b][i][m] * inv[m][k];
                            }
                            gain[i][k] = acc * vj;
                        }
                    }
                    for i in 0..channels {
                        let mut estimate = ZERO;
                        for k in 0..channels {
                            estimate += gain[i][k] * x.get(t, b, k);
                        }
                        source.set(t, b, i, estimate);
                    }
                }
            }
        }
    }
}

fn invert(m: &Mat2, channels: usize) -> Mat2 {
    let mut inv: Mat2 = [[ZERO; 2]; 2];
    if channels == 1 {
        inv[0][0] = m[0][0].inv();
    } else {
        let det_inv = (m[0][0] * m[1][1] - m[0][1] * m[1][0]).inv();
        inv[0][0] = m[1][1] * det_inv;
        inv[0][1] = -m[0][1] * det_inv;
        inv[1][0] = -m[1][0] * det_inv;
        inv[1][1] = m[0][0] * det_inv;
    }
    inv
}
