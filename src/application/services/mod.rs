mod model_registry;
mod separation_service;

pub use model_registry::ModelRegistry;
pub use separation_service::{
    SeparatedStem, SeparationService, SeparationServiceError, StorageOptions,
};
