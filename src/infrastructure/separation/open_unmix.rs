use candle_core::{D, Device, Result, Tensor};
use candle_nn::rnn::{Direction, LSTM, LSTMConfig};
use candle_nn::{BatchNorm, Linear, Module, ModuleT, RNN, VarBuilder};

/// Shape of one Open-Unmix target network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenUnmixConfig {
    /// STFT bins, `n_fft / 2 + 1`.
    pub nb_bins: usize,
    /// Lowest bins fed to the network; the rest only pass through the mask.
    pub max_bin: usize,
    pub nb_channels: usize,
    pub hidden_size: usize,
    pub nb_layers: usize,
    pub unidirectional: bool,
}

impl OpenUnmixConfig {
    /// UMX-L: 4096-point STFT, 16 kHz network bandwidth at 44.1 kHz.
    pub fn umxl() -> Self {
        let n_fft = 4096;
        Self {
            nb_bins: n_fft / 2 + 1,
            max_bin: bandwidth_to_max_bin(44_100, n_fft, 16_000.0),
            nb_channels: 2,
            hidden_size: 1024,
            nb_layers: 3,
            unidirectional: false,
        }
    }
}

/// Number of STFT bins whose centre frequency is at most `bandwidth` Hz.
pub fn bandwidth_to_max_bin(sample_rate: u32, n_fft: usize, bandwidth: f32) -> usize {
    let nb_bins = n_fft / 2 + 1;
    let step = sample_rate as f64 / 2.0 / (nb_bins - 1) as f64;
    let last = (0..nb_bins)
        .rev()
        .find(|&i| i as f64 * step <= bandwidth as f64)
        .unwrap_or(0);
    last + 1
}

struct LstmLayer {
    forward: LSTM,
    backward: Option<LSTM>,
}

/// Open-Unmix spectrogram model: predicts the magnitude of one target from
/// the mixture magnitude.
pub struct OpenUnmix {
    config: OpenUnmixConfig,
    input_mean: Tensor,
    input_scale: Tensor,
    fc1: Linear,
    bn1: BatchNorm,
    lstm: Vec<LstmLayer>,
    fc2: Linear,
    bn2: BatchNorm,
    fc3: Linear,
    bn3: BatchNorm,
    output_scale: Tensor,
    output_mean: Tensor,
    device: Device,
}

impl OpenUnmix {
    /// Loads weights laid out like the PyTorch state dict (`fc1.weight`,
    /// `bn1.running_var`, `lstm.weight_hh_l2_reverse`, ...).
    pub fn load(vb: VarBuilder, config: OpenUnmixConfig) -> Result<Self> {
        let hidden = config.hidden_size;
        let lstm_hidden = if config.unidirectional {
            hidden
        } else {
            hidden / 2
        };

        let fc1 = candle_nn::linear_no_bias(
            config.max_bin * config.nb_channels,
            hidden,
            vb.pp("fc1"),
        )?;
        let bn1 = candle_nn::batch_norm(hidden, 1e-5, vb.pp("bn1"))?;

        let lstm_vb = vb.pp("lstm");
        let mut lstm = Vec::with_capacity(config.nb_layers);
        for layer_idx in 0..config.nb_layers {
            let forward = candle_nn::lstm(
                hidden,
                lstm_hidden,
                LSTMConfig {
                    layer_idx,
                    direction: Direction::Forward,
                    ..Default::default()
                },
                lstm_vb.clone(),
            )?;
            let backward = if config.unidirectional {
                None
            } else {
                Some(candle_nn::lstm(
                    hidden,
                    lstm_hidden,
                    LSTMConfig {
                        layer_idx,
                        direction: Direction::Backward,
                        ..Default::default()
                    },
                    lstm_vb.clone(),
                )?)
            };
            lstm.push(LstmLayer { forward, backward });
        }

        let fc2 = candle_nn::linear_no_bias(hidden * 2, hidden, vb.pp("fc2"))?;
        let bn2 = candle_nn::batch_norm(hidden, 1e-5, vb.pp("bn2"))?;
        let nb_output = config.nb_bins * config.nb_channels;
        let fc3 = candle_nn::linear_no_bias(hidden, nb_output, vb.pp("fc3"))?;
        let bn3 = candle_nn::batch_norm(nb_output, 1e-5, vb.pp("bn3"))?;

        Ok(Self {
            config,
            input_mean: vb.get(config.max_bin, "input_mean")?,
            input_scale: vb.get(config.max_bin, "input_scale")?,
            fc1,
            bn1,
            lstm,
            fc2,
            bn2,
            fc3,
            bn3,
            output_scale: vb.get(config.nb_bins, "output_scale")?,
            output_mean: vb.get(config.nb_bins, "output_mean")?,
            device: vb.device().clone(),
        })
    }

    pub fn config(&self) -> &OpenUnmixConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// `mix` is the mixture magnitude, shaped `(frames, channels, bins)`.
    /// Returns the target magnitude with the same shape.
    pub fn forward(&self, mix: &Tensor) -> Result<Tensor> {
        let (nb_frames, nb_channels, nb_bins) = mix.dims3()?;

        let x = mix.narrow(2, 0, self.config.max_bin)?;
        let x = x.broadcast_add(&self.input_mean)?;
        let x = x.broadcast_mul(&self.input_scale)?;

        let x = x.reshape((nb_frames, nb_channels * self.config.max_bin))?;
        let x = self.fc1.forward(&x)?;
        let x = self.bn1.forward_t(&x, false)?;
        let x = x.tanh()?;

        let lstm_out = self.run_lstm(&x)?;
        let x = Tensor::cat(&[&x, &lstm_out], D::Minus1)?;

        let x = self.fc2.forward(&x)?;
        let x = self.bn2.forward_t(&x, false)?;
        let x = x.relu()?;

        let x = self.fc3.forward(&x)?;
        let x = self.bn3.forward_t(&x, false)?;
        let x = x.reshape((nb_frames, nb_channels, nb_bins))?;

        let x = x.broadcast_mul(&self.output_scale)?;
        let x = x.broadcast_add(&self.output_mean)?;

        x.relu()? * mix
    }

    /// Stacked LSTM over time. `x` is `(frames, features)`; output is
    /// `(frames, hidden_size)`.
    fn run_lstm(&self, x: &Tensor) -> Result<Tensor> {
        let nb_frames = x.dim(0)?;
        let reversed: Vec<u32> = (0..nb_frames as u32).rev().collect();
        let reversed = Tensor::new(reversed.as_slice(), &self.device)?;

        let mut input = x.unsqueeze(0)?;
        for layer in &self.lstm {
            let states = layer.forward.seq(&input)?;
            let forward = layer.forward.states_to_tensor(&states)?;

            input = match &layer.backward {
                None => forward,
                Some(backward) => {
                    let flipped = input.index_select(&reversed, 1)?;
                    let states = backward.seq(&flipped)?;
                    let out = backward
                        .states_to_tensor(&states)?
                        .index_select(&reversed, 1)?;
                    Tensor::cat(&[&forward, &out], D::Minus1)?
                }
            };
        }

        input.squeeze(0)
    }
}
