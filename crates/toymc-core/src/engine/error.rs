use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::xyz::XyzError;
use crate::core::models::geometry::GeometryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid simulation parameters: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid starting geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Cutoff {cutoff} exceeds half the smallest box side ({half_box})")]
    CutoffTooLarge { cutoff: f64, half_box: f64 },

    #[error("Energy is not finite ({energy}) at step {step}; check for overlapping atoms")]
    Diverged { step: u64, energy: f64 },

    #[error("Failed to write trajectory frame at step {step}: {source}")]
    Output {
        step: u64,
        #[source]
        source: XyzError,
    },
}
