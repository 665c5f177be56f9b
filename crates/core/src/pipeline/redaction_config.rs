use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blurring::domain::blur_settings::{BlurSettings, BlurSettingsError};
use crate::detection::domain::detector_backend::DetectorBackend;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("confidence must be between 0 and 1, got {0}")]
    Confidence(f64),
    #[error(transparent)]
    Blur(#[from] BlurSettingsError),
}

/// Everything a redaction run can be tuned with.
///
/// Unset fields fall back to the defaults of the chosen backend, so
/// `{"backend": "deep"}` is a complete config.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedactionConfig {
    pub backend: DetectorBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur: Option<BlurSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,
}

impl RedactionConfig {
    pub fn for_backend(backend: DetectorBackend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Reads a JSON config file. The result is not validated yet.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let confidence = self.effective_confidence();
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigError::Confidence(confidence));
        }
        self.effective_blur().validate()?;
        Ok(())
    }

    pub fn effective_confidence(&self) -> f64 {
        self.confidence
            .unwrap_or_else(|| self.backend.default_confidence())
    }

    pub fn effective_blur(&self) -> BlurSettings {
        self.blur
            .unwrap_or_else(|| BlurSettings::for_backend(self.backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults_follow_backend() {
        let geometric = RedactionConfig::default();
        assert_eq!(geometric.backend, DetectorBackend::Geometric);
        assert_relative_eq!(geometric.effective_confidence(), 0.3);
        assert_eq!(geometric.effective_blur().kernel_size, 51);

        let deep = RedactionConfig::for_backend(DetectorBackend::DeepModel);
        assert_eq!(deep.effective_blur().kernel_size, 99);
        assert!(deep.validate().is_ok());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = RedactionConfig {
            backend: DetectorBackend::DeepModel,
            confidence: Some(0.6),
            blur: Some(BlurSettings::new(31, 8.0).unwrap()),
            model_dir: None,
        };
        assert_relative_eq!(config.effective_confidence(), 0.6);
        assert_eq!(config.effective_blur().kernel_size, 31);
    }

    #[rstest]
    #[case::negative(-0.1)]
    #[case::above_one(1.5)]
    #[case::nan(f64::NAN)]
    fn test_rejects_confidence_out_of_range(#[case] confidence: f64) {
        let config = RedactionConfig {
            confidence: Some(confidence),
            ..RedactionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Confidence(_))));
    }

    #[test]
    fn test_rejects_even_kernel() {
        let config = RedactionConfig {
            blur: Some(BlurSettings {
                kernel_size: 40,
                sigma: 10.0,
            }),
            ..RedactionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Blur(BlurSettingsError::EvenOrZeroKernel(40)))
        ));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faceblur.json");
        fs::write(&path, r#"{"backend": "deep", "confidence": 0.4}"#).unwrap();

        let config = RedactionConfig::load(&path).unwrap();
        assert_eq!(config.backend, DetectorBackend::DeepModel);
        assert_eq!(config.confidence, Some(0.4));
        assert!(config.blur.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faceblur.json");
        fs::write(
            &path,
            r#"{"backend": "geometric", "blur": {"kernel_size": 71, "sigma": 40.0}, "model_dir": "/opt/models"}"#,
        )
        .unwrap();

        let config = RedactionConfig::load(&path).unwrap();
        assert_eq!(config.effective_blur(), BlurSettings::new(71, 40.0).unwrap());
        assert_eq!(config.model_dir.as_deref(), Some(Path::new("/opt/models")));
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faceblur.json");
        fs::write(&path, r#"{"backend": "deep", "codec": "h264"}"#).unwrap();

        assert!(matches!(
            RedactionConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RedactionConfig::load(Path::new("/nonexistent/faceblur.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/faceblur.json"));
    }

    #[test]
    fn test_serializes_only_set_fields() {
        let json = serde_json::to_string(&RedactionConfig::default()).unwrap();
        assert_eq!(json, r#"{"backend":"geometric"}"#);
    }
}
