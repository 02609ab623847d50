use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::config::CameraConfig;
use crate::environment::{HealthStatus, Plant, PlantArena};
use crate::utils::errors::SimError;
use crate::utils::math::{deg_to_rad, euler_to_quaternion, finite_or};
use crate::utils::rng::RngManager;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Png,
    Jpeg,
}

impl FrameFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            FrameFormat::Png => "image/png",
            FrameFormat::Jpeg => "image/jpeg",
        }
    }
}

/// One encoded camera image
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    pub data: Vec<u8>,
    /// Altitude the frame was rendered at, after clamping [m]
    pub altitude: f64,
    pub plants_in_view: usize,
}

impl CameraFrame {
    pub fn to_base64(&self) -> String {
        base64::prelude::BASE64_STANDARD.encode(&self.data)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "frame": self.to_base64(),
            "index": self.index,
            "width": self.width,
            "height": self.height,
            "format": self.format,
            "mime_type": self.format.mime_type(),
            "altitude": self.altitude,
            "plants_in_view": self.plants_in_view,
        })
    }
}

/// Camera pose after sanitizing
#[derive(Debug, Clone, Copy)]
struct ViewPose {
    altitude: f64,
    centre: (f64, f64),
    heading: f64,
}

/// Low-fidelity downward camera over the plant field
pub struct CameraRenderer {
    config: CameraConfig,
    rngs: RngManager,
}

const SOIL: [f32; 3] = [0.42, 0.30, 0.18];
const MAX_TILT: f64 = 1.0; // rad

impl CameraRenderer {
    pub fn new(config: CameraConfig, rngs: &RngManager) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            rngs: rngs.clone(),
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: CameraConfig) -> Result<(), SimError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    fn view_pose(&self, position: &Vector3<f64>, rotation: &Vector3<f64>) -> ViewPose {
        let clean = |v: &Vector3<f64>| v.map(|c| finite_or(c, 0.0));
        let position = clean(position);
        let rotation = clean(rotation);

        let altitude = position
            .y
            .clamp(self.config.min_render_altitude, self.config.max_render_altitude);
        let attitude = euler_to_quaternion(&rotation);
        let forward = attitude * Vector3::z();
        let look = attitude * -Vector3::y();

        // Tilt shifts the footprint; cap it so grazing angles stay bounded
        let horizontal = Vector3::new(look.x, 0.0, look.z);
        let tilt = horizontal.norm().atan2(-look.y).clamp(-MAX_TILT, MAX_TILT);
        let shift = altitude * tilt.tan();
        let (sx, sz) = if horizontal.norm() > 1e-9 {
            let dir = horizontal.normalize();
            (dir.x * shift, dir.z * shift)
        } else {
            (0.0, 0.0)
        };

        ViewPose {
            altitude,
            centre: (position.x + sx, position.z + sz),
            heading: forward.x.atan2(forward.z),
        }
    }

    fn plant_colour(plant: &Plant, brightness: f32) -> Color {
        let base = match plant.health {
            HealthStatus::Healthy => [0.20, 0.62, 0.18],
            HealthStatus::Sick => [0.70, 0.58, 0.15],
            HealthStatus::Unknown => [0.45, 0.55, 0.20],
        };
        let blight = (plant.disease_level / 100.0) as f32 * 0.5;
        let mix = |c: f32, target: f32| ((c * (1.0 - blight) + target * blight) * brightness).clamp(0.0, 1.0);
        Color::from_rgba(mix(base[0], 0.45), mix(base[1], 0.30), mix(base[2], 0.10), 1.0)
            .unwrap_or(Color::BLACK)
    }

    /// Render frame `index` from the given drone pose.
    ///
    /// Out-of-range poses are clamped; only encoding can fail.
    pub fn render(
        &self,
        index: u64,
        position: &Vector3<f64>,
        rotation: &Vector3<f64>,
        plants: &PlantArena,
        sunlight: f64,
    ) -> Result<CameraFrame, SimError> {
        let (w, h) = (self.config.width, self.config.height);
        let mut pixmap = Pixmap::new(w, h)
            .ok_or_else(|| SimError::RenderError(format!("cannot allocate {}x{} frame", w, h)))?;

        let brightness = (0.35 + 0.65 * finite_or(sunlight, 50.0).clamp(0.0, 100.0) / 100.0) as f32;
        pixmap.fill(
            Color::from_rgba(SOIL[0] * brightness, SOIL[1] * brightness, SOIL[2] * brightness, 1.0)
                .unwrap_or(Color::BLACK),
        );

        let pose = self.view_pose(position, rotation);
        let half_width = pose.altitude * deg_to_rad(self.config.fov / 2.0).tan();
        let scale = (w as f64 / 2.0) / half_width; // px per metre
        let (sin_h, cos_h) = pose.heading.sin_cos();
        let reach = half_width * std::f64::consts::SQRT_2;

        let mut in_view = 0;
        for plant in plants.iter() {
            let dx = plant.position.x - pose.centre.0;
            let dz = plant.position.z - pose.centre.1;
            if dx.abs() > reach + plant.size || dz.abs() > reach + plant.size {
                continue;
            }
            // Rotate into the camera frame: up in the image is the heading
            let right = dx * cos_h - dz * sin_h;
            let ahead = dx * sin_h + dz * cos_h;
            let px = (w as f64 / 2.0 + right * scale) as f32;
            let py = (h as f64 / 2.0 - ahead * scale) as f32;
            let radius = ((plant.size / 2.0).max(0.05) * scale).max(1.0) as f32;

            if px + radius < 0.0 || py + radius < 0.0 || px - radius > w as f32 || py - radius > h as f32 {
                continue;
            }
            let Some(circle) = PathBuilder::from_circle(px, py, radius) else {
                continue;
            };
            let mut paint = Paint::default();
            paint.set_color(Self::plant_colour(plant, brightness));
            paint.anti_alias = true;
            pixmap.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
            in_view += 1;
        }

        self.apply_noise(&mut pixmap, index);
        let data = self.encode(&pixmap)?;

        Ok(CameraFrame {
            index,
            width: w,
            height: h,
            format: self.config.format,
            data,
            altitude: pose.altitude,
            plants_in_view: in_view,
        })
    }

    fn apply_noise(&self, pixmap: &mut Pixmap, index: u64) {
        let amplitude = self.config.noise_amplitude;
        if amplitude <= 0.0 {
            return;
        }
        let mut rng = self.rngs.get_indexed_rng("camera", index);
        for pixel in pixmap.data_mut().chunks_exact_mut(4) {
            for channel in pixel.iter_mut().take(3) {
                let jitter: f32 = rng.gen_range(-amplitude..=amplitude);
                *channel = (*channel as f32 + jitter).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    fn encode(&self, pixmap: &Pixmap) -> Result<Vec<u8>, SimError> {
        match self.config.format {
            FrameFormat::Png => pixmap
                .encode_png()
                .map_err(|e| SimError::RenderError(format!("png encoding failed: {}", e))),
            FrameFormat::Jpeg => {
                // Frames are opaque, so premultiplied RGBA is plain RGBA
                let rgb: Vec<u8> = pixmap
                    .data()
                    .chunks_exact(4)
                    .flat_map(|p| [p[0], p[1], p[2]])
                    .collect();
                let mut out = Vec::new();
                JpegEncoder::new_with_quality(&mut out, self.config.jpeg_quality)
                    .encode(&rgb, pixmap.width(), pixmap.height(), ColorType::Rgb8)
                    .map_err(|e| SimError::RenderError(format!("jpeg encoding failed: {}", e)))?;
                Ok(out)
            }
        }
    }
}
