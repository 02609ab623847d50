use serde::{Deserialize, Serialize};

use crate::config::{ensure_non_negative, ensure_positive, ConfigError};
use crate::rendering::FrameFormat;

/// Synthetic downward-facing camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// Full horizontal field of view [deg]
    pub fov: f64,
    pub format: FrameFormat,
    pub jpeg_quality: u8,
    /// Peak per-pixel noise added to every frame [intensity levels]
    pub noise_amplitude: f32,
    /// Altitudes above this are rendered as if at this height [m]
    pub max_render_altitude: f64,
    pub min_render_altitude: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            fov: 70.0,
            format: FrameFormat::Png,
            jpeg_quality: 80,
            noise_amplitude: 10.0,
            max_render_altitude: 120.0,
            min_render_altitude: 0.5,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.width > 2048 {
            return Err(ConfigError::invalid("camera.width", self.width));
        }
        if self.height == 0 || self.height > 2048 {
            return Err(ConfigError::invalid("camera.height", self.height));
        }
        if !(self.fov > 1.0 && self.fov < 170.0) {
            return Err(ConfigError::invalid("camera.fov", self.fov));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::invalid("camera.jpeg_quality", self.jpeg_quality));
        }
        ensure_non_negative("camera.noise_amplitude", self.noise_amplitude as f64)?;
        ensure_positive("camera.min_render_altitude", self.min_render_altitude)?;
        if self.max_render_altitude <= self.min_render_altitude {
            return Err(ConfigError::ValidationError(format!(
                "camera render altitude range [{}, {}] is empty",
                self.min_render_altitude, self.max_render_altitude
            )));
        }
        Ok(())
    }
}
