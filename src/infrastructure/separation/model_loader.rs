use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};

use crate::application::ports::SeparationError;
use crate::application::services::ModelRegistry;
use crate::domain::StemTarget;
use crate::presentation::config::{ModelSettings, ModelSourceSetting, SeparationSettings};

use super::open_unmix::{OpenUnmix, OpenUnmixConfig, bandwidth_to_max_bin};
use super::stft::Stft;
use super::unmix_separator::UnmixSeparator;
use super::wiener::WienerConfig;

const WEIGHT_EXTENSIONS: [&str; 2] = ["safetensors", "pth"];

pub struct UnmixModelLoader;

impl UnmixModelLoader {
    /// Loads one network per target and wraps each in a separator.
    pub fn load_registry(
        model: &ModelSettings,
        separation: &SeparationSettings,
    ) -> Result<ModelRegistry, SeparationError> {
        let device = Device::Cpu;
        let config = network_config(model);
        let wiener = wiener_config(separation);
        if wiener.iterations > 0 && !wiener.residual {
            return Err(SeparationError::ModelLoadFailed(
                "separation.residual must be enabled when separation.niter > 0".to_string(),
            ));
        }

        tracing::info!(
            device = ?device,
            source = ?model.source,
            hidden_size = config.hidden_size,
            max_bin = config.max_bin,
            "Loading Open-Unmix models"
        );

        let mut registry = ModelRegistry::new();
        for target in StemTarget::ALL {
            let weights = resolve_weights(model, target)?;
            let vb = var_builder(&weights, &device)?;
            let network = OpenUnmix::load(vb, config).map_err(|e| {
                SeparationError::ModelLoadFailed(format!("{}: {}", target, e))
            })?;
            let stft = Stft::new(model.n_fft, model.n_hop)?;
            let separator = UnmixSeparator::new(target, network, stft, wiener, model.sample_rate)?;
            registry.insert(Arc::new(separator));

            tracing::info!(stem = %target, weights = %weights.display(), "Model loaded");
        }

        Ok(registry)
    }
}

pub fn network_config(model: &ModelSettings) -> OpenUnmixConfig {
    OpenUnmixConfig {
        nb_bins: model.n_fft / 2 + 1,
        max_bin: bandwidth_to_max_bin(model.sample_rate, model.n_fft, model.bandwidth_hz),
        nb_channels: model.nb_channels,
        hidden_size: model.hidden_size,
        nb_layers: model.nb_layers,
        unidirectional: false,
    }
}

pub fn wiener_config(separation: &SeparationSettings) -> WienerConfig {
    WienerConfig {
        iterations: separation.niter,
        softmask: separation.softmask,
        residual: separation.residual,
        window_frames: separation.wiener_win_len,
        ..WienerConfig::default()
    }
}

fn resolve_weights(model: &ModelSettings, target: StemTarget) -> Result<PathBuf, SeparationError> {
    match model.source {
        ModelSourceSetting::Local => WEIGHT_EXTENSIONS
            .iter()
            .map(|ext| model.directory.join(format!("{}.{}", target, ext)))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                SeparationError::ModelLoadFailed(format!(
                    "no {}.safetensors or {}.pth in {}",
                    target,
                    target,
                    model.directory.display()
                ))
            }),
        ModelSourceSetting::HuggingFace => {
            let api = Api::new().map_err(|e| SeparationError::ModelLoadFailed(e.to_string()))?;
            let repo = api.repo(Repo::with_revision(
                model.repo.clone(),
                RepoType::Model,
                model.revision.clone(),
            ));
            for ext in WEIGHT_EXTENSIONS {
                let name = format!("{}.{}", target, ext);
                match repo.get(&name) {
                    Ok(path) => return Ok(path),
                    Err(e) => tracing::debug!(file = %name, error = %e, "Weights not in repo"),
                }
            }
            Err(SeparationError::ModelLoadFailed(format!(
                "no weights for {} in {}@{}",
                target, model.repo, model.revision
            )))
        }
    }
}

fn var_builder(path: &Path, device: &Device) -> Result<VarBuilder<'static>, SeparationError> {
    let is_safetensors = path.extension().and_then(|e| e.to_str()) == Some("safetensors");
    let vb = if is_safetensors {
        // SAFETY: weight files are memory-mapped read-only and not modified while loaded
        unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device) }
    } else {
        VarBuilder::from_pth(path, DType::F32, device)
    };
    vb.map_err(|e| SeparationError::ModelLoadFailed(format!("{}: {}", path.display(), e)))
}
