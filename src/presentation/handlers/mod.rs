mod health;
mod separate;
mod targets;

pub use health::health_handler;
pub use separate::{ErrorResponse, separate_handler};
pub use targets::targets_handler;
