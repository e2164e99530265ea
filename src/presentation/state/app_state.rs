use std::sync::Arc;

use crate::application::services::SeparationService;

#[derive(Clone)]
pub struct AppState {
    pub separation_service: Arc<SeparationService>,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}
