//! Tunables for the backdrop, loadable from JSON. Every field has a default,
//! so a config file only needs the values it changes.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::animation::Motion;
use crate::compositor::BloomSettings;
use crate::easing::Easing;
use crate::error::{Error, Result};
use crate::window::WindowConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarConfig {
    pub count: usize,
    /// Full width of the uniform placement range on each axis.
    pub spread: Vec3,
    /// Centre of the placement volume.
    pub offset: Vec3,
    pub radius: f32,
    /// Full width of the uniform range added to `radius`.
    pub radius_spread: f32,
    /// Width and height segments of the shared sphere mesh.
    pub segments: u32,
    pub color: u32,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            count: 500,
            spread: Vec3::new(1000.0, 300.0, 300.0),
            offset: Vec3::new(0.0, 100.0, -200.0),
            radius: 0.5,
            radius_spread: 0.5,
            segments: 25,
            color: 0xffffff,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
    pub color: u32,
    pub position: Vec3,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            radius: 10.0,
            tube: 4.0,
            radial_segments: 100,
            tubular_segments: 100,
            color: 0xff5345,
            position: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub enabled: bool,
    pub width: f32,
    pub depth: f32,
    pub segments: u32,
    pub displacement_scale: f32,
    pub color: u32,
    pub position: Vec3,
    /// XYZ Euler radians.
    pub rotation: Vec3,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 2000.0,
            depth: 2000.0,
            segments: 256,
            displacement_scale: 350.0,
            color: 0x808080,
            position: Vec3::new(0.0, -100.0, 0.0),
            rotation: Vec3::new(-PI / 2.0, 0.0, PI),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Catalog key paths.
    pub title_key: String,
    pub description_key: String,
    pub title_size: f32,
    pub description_size: f32,
    /// Extrusion depth.
    pub depth: f32,
    pub title_y: f32,
    pub description_y: f32,
    pub z: f32,
    pub color: u32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            title_key: "intro.title".into(),
            description_key: "intro.description".into(),
            title_size: 18.0,
            description_size: 10.0,
            depth: 4.0,
            title_y: 100.0,
            description_y: 80.0,
            z: 50.0,
            color: 0xffffff,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub point_position: Vec3,
    pub point_color: u32,
    pub point_intensity: f32,
    /// 0 disables distance falloff.
    pub point_distance: f32,
    pub ambient_color: u32,
    pub ambient_intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            point_position: Vec3::new(5.0, 5.0, 5.0),
            point_color: 0xffffff,
            point_intensity: 1.0,
            point_distance: 0.0,
            ambient_color: 0xffffff,
            ambient_intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees before the focal length is applied.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    /// Millimetres on a 35 mm film gauge; overrides `fov` when set.
    pub focal_length: Option<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 30.0, 150.0),
            focal_length: Some(10.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub duration_ms: u64,
    /// Depth units moved per wheel gesture.
    pub step: f32,
    pub easing: Easing,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self { duration_ms: 200, step: 5.0, easing: Easing::default() }
    }
}

impl ScrollConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub font: PathBuf,
    pub catalog: PathBuf,
    pub terrain_color: PathBuf,
    pub terrain_height: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            font: "assets/fonts/pixel.json".into(),
            catalog: "assets/i18n/intro.json".into(),
            terrain_color: "assets/textures/plane_texture.png".into(),
            terrain_height: "assets/textures/height.png".into(),
        }
    }
}

impl AssetPaths {
    /// Resolve relative paths against `base`.
    pub fn relative_to(&self, base: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { base.join(p) };
        Self {
            font: join(&self.font),
            catalog: join(&self.catalog),
            terrain_color: join(&self.terrain_color),
            terrain_height: join(&self.terrain_height),
        }
    }
}

/// Everything the backdrop can be tuned with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackdropConfig {
    /// Fixed RNG seed for reproducible star placement and jitter.
    pub seed: Option<u64>,
    pub motion: Motion,
    pub stars: StarConfig,
    pub shape: ShapeConfig,
    pub terrain: TerrainConfig,
    pub text: TextConfig,
    pub lights: LightConfig,
    pub camera: CameraConfig,
    pub bloom: BloomSettings,
    pub scroll: ScrollConfig,
    pub assets: AssetPaths,
    pub window: WindowConfig,
}

fn check(ok: bool, what: impl FnOnce() -> String) -> Result<()> {
    if ok { Ok(()) } else { Err(Error::Configuration(what())) }
}

fn finite(v: Vec3) -> bool {
    v.is_finite()
}

impl BackdropConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("config: loaded {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let m = &self.motion;
        check(m.jitter_step.is_finite() && m.jitter_step >= 0.0, || {
            format!("motion.jitter_step must be finite and non-negative, got {}", m.jitter_step)
        })?;
        check(finite(m.rotation_step), || "motion.rotation_step must be finite".into())?;

        let s = &self.stars;
        check(finite(s.spread) && s.spread.min_element() >= 0.0, || {
            "stars.spread must be finite and non-negative".into()
        })?;
        check(finite(s.offset), || "stars.offset must be finite".into())?;
        check(s.radius.is_finite() && s.radius_spread.is_finite() && s.radius - s.radius_spread / 2.0 > 0.0, || {
            format!("stars.radius {} with spread {} can reach zero", s.radius, s.radius_spread)
        })?;

        check(s.segments >= 3, || format!("stars.segments must be at least 3, got {}", s.segments))?;

        let sh = &self.shape;
        check(sh.radius > 0.0 && sh.tube > 0.0, || "shape radius and tube must be positive".into())?;
        check(sh.radial_segments >= 3 && sh.tubular_segments >= 3, || {
            "shape needs at least 3 segments each way".into()
        })?;

        let t = &self.terrain;
        check(t.width > 0.0 && t.depth > 0.0 && t.segments >= 1, || {
            "terrain needs a positive size and at least one segment".into()
        })?;
        check(t.displacement_scale.is_finite() && finite(t.position) && finite(t.rotation), || {
            "terrain placement must be finite".into()
        })?;

        let tx = &self.text;
        check(tx.title_size > 0.0 && tx.description_size > 0.0 && tx.depth >= 0.0, || {
            "text sizes must be positive and depth non-negative".into()
        })?;
        check(!tx.title_key.is_empty() && !tx.description_key.is_empty(), || "text keys must not be empty".into())?;

        let l = &self.lights;
        check(finite(l.point_position) && l.point_intensity >= 0.0 && l.ambient_intensity >= 0.0 && l.point_distance >= 0.0, || {
            "light intensities and distance must be non-negative".into()
        })?;

        let c = &self.camera;
        check(c.fov > 0.0 && c.fov < 180.0, || format!("camera.fov {} out of (0, 180)", c.fov))?;
        check(c.near > 0.0 && c.far > c.near, || format!("camera near {} / far {} invalid", c.near, c.far))?;
        check(finite(c.position), || "camera.position must be finite".into())?;
        if let Some(focal) = c.focal_length {
            check(focal.is_finite() && focal > 0.0, || format!("camera.focal_length {focal} must be positive"))?;
        }

        let b = &self.bloom;
        check(b.strength >= 0.0 && b.threshold >= 0.0 && (0.0..=1.0).contains(&b.radius), || {
            format!("bloom settings out of range: {b:?}")
        })?;

        let sc = &self.scroll;
        check(sc.duration_ms > 0, || "scroll.duration_ms must be positive".into())?;
        check(sc.step.is_finite(), || "scroll.step must be finite".into())?;
        if let Easing::Curve(curve) = &sc.easing {
            curve.validate()?;
        }

        let w = &self.window;
        check(w.width > 0 && w.height > 0, || "window size must be positive".into())?;
        Ok(())
    }
}
