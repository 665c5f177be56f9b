use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Selects which face localization backend a run uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorBackend {
    /// BlazeFace short-range: fast, lower recall, normalized output boxes.
    #[default]
    Geometric,
    /// YOLO face model: slower, higher recall, pixel-space boxes.
    #[serde(rename = "deep")]
    DeepModel,
}

impl DetectorBackend {
    pub const ALL: &'static [DetectorBackend] =
        &[DetectorBackend::Geometric, DetectorBackend::DeepModel];

    pub fn default_confidence(&self) -> f64 {
        match self {
            DetectorBackend::Geometric => 0.3,
            DetectorBackend::DeepModel => 0.25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorBackend::Geometric => "geometric",
            DetectorBackend::DeepModel => "deep",
        }
    }
}

impl fmt::Display for DetectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "geometric" => Ok(DetectorBackend::Geometric),
            "deep" => Ok(DetectorBackend::DeepModel),
            other => Err(format!(
                "unknown detector backend '{other}' (expected 'geometric' or 'deep')"
            )),
        }
    }
}
