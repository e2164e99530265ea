use std::path::Path;

use bytes::Bytes;

const DEFAULT_EXTENSION: &str = "mp3";

/// Raw audio file as received from a client.
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    pub filename: Option<String>,
    pub data: Bytes,
}

impl UploadedAudio {
    pub fn new(filename: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename,
            data: data.into(),
        }
    }

    /// Extension of the client's filename, used as the decoder's format hint.
    /// Falls back to `mp3` when the name has none.
    pub fn extension(&self) -> String {
        self.filename
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
