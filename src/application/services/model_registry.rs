use std::collections::HashMap;
use std::sync::Arc;

use crate::application::ports::StemSeparator;
use crate::domain::StemTarget;

/// Pre-loaded separators keyed by the stem they extract. Built once at
/// startup and only read afterwards.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<StemTarget, Arc<dyn StemSeparator>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `separator` under the target it reports. A later insert for
    /// the same target replaces the earlier one.
    pub fn insert(&mut self, separator: Arc<dyn StemSeparator>) {
        self.models.insert(separator.target(), separator);
    }

    pub fn get(&self, target: StemTarget) -> Option<Arc<dyn StemSeparator>> {
        self.models.get(&target).map(Arc::clone)
    }

    pub fn targets(&self) -> Vec<StemTarget> {
        StemTarget::ALL
            .into_iter()
            .filter(|t| self.models.contains_key(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl FromIterator<Arc<dyn StemSeparator>> for ModelRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn StemSeparator>>>(iter: I) -> Self {
        let mut registry = Self::new();
        for separator in iter {
            registry.insert(separator);
        }
        registry
    }
}
