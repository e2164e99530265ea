mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    LoggingSettings, ModelSettings, ModelSourceSetting, SeparationSettings, ServerSettings,
    Settings, StorageSettings,
};
