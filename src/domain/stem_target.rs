use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the stems the separation models can isolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemTarget {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl StemTarget {
    pub const ALL: [StemTarget; 4] = [Self::Vocals, Self::Drums, Self::Bass, Self::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vocals => "vocals",
            Self::Drums => "drums",
            Self::Bass => "bass",
            Self::Other => "other",
        }
    }

    /// File name the separated stem is written under.
    pub fn output_file_name(&self) -> String {
        format!("separated_{}.wav", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Target must be: vocals, drums, bass, or other")]
pub struct UnknownTarget(pub String);

impl FromStr for StemTarget {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vocals" => Ok(Self::Vocals),
            "drums" => Ok(Self::Drums),
            "bass" => Ok(Self::Bass),
            "other" => Ok(Self::Other),
            other => Err(UnknownTarget(other.to_string())),
        }
    }
}

impl fmt::Display for StemTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
