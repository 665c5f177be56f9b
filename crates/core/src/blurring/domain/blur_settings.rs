use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detector_backend::DetectorBackend;

/// Kernel for boxes from the geometric backend, which are loose around the face.
pub const GEOMETRIC_KERNEL_SIZE: usize = 51;
pub const GEOMETRIC_SIGMA: f64 = 30.0;

/// Kernel for boxes from the deep-model backend, which hug the face tightly.
pub const DEEP_MODEL_KERNEL_SIZE: usize = 99;
pub const DEEP_MODEL_SIGMA: f64 = 50.0;

#[derive(Error, Debug, PartialEq)]
pub enum BlurSettingsError {
    #[error("blur kernel size must be a positive odd integer, got {0}")]
    EvenOrZeroKernel(usize),
    #[error("blur sigma must be a positive finite number, got {0}")]
    InvalidSigma(f64),
}

/// Gaussian kernel parameters used to redact a region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlurSettings {
    pub kernel_size: usize,
    pub sigma: f64,
}

impl BlurSettings {
    pub fn new(kernel_size: usize, sigma: f64) -> Result<Self, BlurSettingsError> {
        let settings = Self { kernel_size, sigma };
        settings.validate()?;
        Ok(settings)
    }

    /// Tuned kernel for the given backend's typical box tightness.
    pub fn for_backend(backend: DetectorBackend) -> Self {
        match backend {
            DetectorBackend::Geometric => Self {
                kernel_size: GEOMETRIC_KERNEL_SIZE,
                sigma: GEOMETRIC_SIGMA,
            },
            DetectorBackend::DeepModel => Self {
                kernel_size: DEEP_MODEL_KERNEL_SIZE,
                sigma: DEEP_MODEL_SIGMA,
            },
        }
    }

    pub fn validate(&self) -> Result<(), BlurSettingsError> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(BlurSettingsError::EvenOrZeroKernel(self.kernel_size));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(BlurSettingsError::InvalidSigma(self.sigma));
        }
        Ok(())
    }
}
