use std::path::PathBuf;

use ::config::{Config, ConfigError, Environment as EnvironmentSource, File};
use serde::Deserialize;

use super::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub separation: SeparationSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl ServerSettings {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub source: ModelSourceSetting,
    /// Directory holding `{target}.safetensors` or `{target}.pth` when
    /// `source = "local"`.
    pub directory: PathBuf,
    /// Hugging Face repo id when `source = "huggingface"`.
    pub repo: String,
    pub revision: String,
    pub sample_rate: u32,
    pub n_fft: usize,
    pub n_hop: usize,
    pub hidden_size: usize,
    pub nb_layers: usize,
    pub nb_channels: usize,
    pub bandwidth_hz: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSourceSetting {
    Local,
    #[serde(rename = "huggingface")]
    HuggingFace,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeparationSettings {
    pub niter: usize,
    pub softmask: bool,
    pub residual: bool,
    pub wiener_win_len: usize,
    pub max_concurrent_jobs: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub persist_output: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Settings {
    /// Layers built-in defaults, `appsettings.{environment}.*` (optional) and
    /// `APP__SECTION__KEY` environment variables, in that order.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Self::builder(environment)?
            .add_source(
                EnvironmentSource::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults plus the environment's settings file, without reading
    /// process environment variables.
    pub fn load_from_file(environment: Environment) -> Result<Self, ConfigError> {
        Self::builder(environment)?.build()?.try_deserialize()
    }

    fn builder(
        environment: Environment,
    ) -> Result<::config::builder::ConfigBuilder<::config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.max_upload_mb", 100)?
            .set_default("model.source", "local")?
            .set_default("model.directory", "models")?
            .set_default("model.repo", "")?
            .set_default("model.revision", "main")?
            .set_default("model.sample_rate", 44_100)?
            .set_default("model.n_fft", 4096)?
            .set_default("model.n_hop", 1024)?
            .set_default("model.hidden_size", 1024)?
            .set_default("model.nb_layers", 3)?
            .set_default("model.nb_channels", 2)?
            .set_default("model.bandwidth_hz", 16_000.0)?
            .set_default("separation.niter", 1)?
            .set_default("separation.softmask", false)?
            .set_default("separation.residual", true)?
            .set_default("separation.wiener_win_len", 300)?
            .set_default("separation.max_concurrent_jobs", 2)?
            .set_default("storage.upload_dir", "tmp/uploads")?
            .set_default("storage.output_dir", ".")?
            .set_default("storage.persist_output", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.enable_json", false)?
            .add_source(File::with_name(&environment.settings_file()).required(false)))
    }
}
