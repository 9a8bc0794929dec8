//! Spirit configuration
//!
//! Settings are read from a TOML file with every field optional:
//!
//! ```toml
//! [simulator]
//! amount = 250000
//! attraction = 2.6
//!
//! [particles]
//! color1 = "#8b160e"
//! point_size = 1.6
//!
//! [asset]
//! path = "assets/horse.glb"
//!
//! [fallback]
//! kind = "silhouette"
//! scale = 80.0
//! ```

use crate::color::{Color, ColorRamp};
use crate::error::{Result, SpiritError};
use crate::grid::{ParticleGrid, MAX_GRID_SIZE};
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SpiritConfig {
    #[serde(default)]
    pub simulator: SimulatorSettings,
    #[serde(default)]
    pub particles: ParticleSettings,
    #[serde(default)]
    pub asset: AssetSettings,
    #[serde(default)]
    pub fallback: FallbackShape,
    /// Let the pointer drag the follow point while no mesh is loaded
    #[serde(default)]
    pub follow_pointer: bool,
}

impl SpiritConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SpiritConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<()> {
        self.simulator.validate()?;
        self.particles.validate()?;
        self.asset.validate()?;
        self.fallback.validate()
    }
}

fn check_finite(name: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SpiritError::Config(format!("{} must be finite, got {}", name, value)))
    }
}

fn check_non_negative(name: &str, value: f32) -> Result<()> {
    check_finite(name, value)?;
    if value < 0.0 {
        return Err(SpiritError::Config(format!(
            "{} must not be negative, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f32) -> Result<()> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(SpiritError::Config(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

// =============================================================================
// Simulation
// =============================================================================

/// Simulation tunables
///
/// Everything except `amount` is live: changes apply on the next tick.
/// `amount` fixes the texture size and is read once at construction.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SimulatorSettings {
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_die_speed")]
    pub die_speed: f32,
    /// Respawn jitter radius
    #[serde(default = "default_radius")]
    pub radius: f32,
    /// Curl noise frequency
    #[serde(default = "default_curl_size")]
    pub curl_size: f32,
    #[serde(default = "default_attraction")]
    pub attraction: f32,
    /// Requested particle count
    #[serde(default = "default_amount")]
    pub amount: u32,
}

fn default_speed() -> f32 {
    0.5
}

fn default_die_speed() -> f32 {
    0.005
}

fn default_radius() -> f32 {
    0.5
}

fn default_curl_size() -> f32 {
    0.01
}

fn default_attraction() -> f32 {
    2.6
}

fn default_amount() -> u32 {
    256 * 256
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            die_speed: default_die_speed(),
            radius: default_radius(),
            curl_size: default_curl_size(),
            attraction: default_attraction(),
            amount: default_amount(),
        }
    }
}

impl SimulatorSettings {
    pub fn validate(&self) -> Result<()> {
        check_non_negative("speed", self.speed)?;
        check_non_negative("die_speed", self.die_speed)?;
        check_non_negative("radius", self.radius)?;
        check_non_negative("curl_size", self.curl_size)?;
        check_finite("attraction", self.attraction)?;
        if self.amount == 0 {
            return Err(SpiritError::Config("amount must be at least 1".into()));
        }
        let size = ParticleGrid::for_count(self.amount).size();
        if size > MAX_GRID_SIZE {
            return Err(SpiritError::Config(format!(
                "amount {} needs a {}x{} grid, the limit is {}x{}",
                self.amount, size, size, MAX_GRID_SIZE, MAX_GRID_SIZE
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Particle appearance
// =============================================================================

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ParticleSettings {
    #[serde(default = "default_color1")]
    pub color1: Color,
    #[serde(default = "default_color2")]
    pub color2: Color,
    #[serde(default = "default_color3")]
    pub color3: Color,
    #[serde(default = "default_hover_color")]
    pub hover_color: Color,
    /// Point extent in pixels
    #[serde(default = "default_point_size")]
    pub point_size: f32,
    /// Distance at which the pointer highlight fades out
    #[serde(default = "default_hover_radius")]
    pub hover_radius: f32,
}

fn default_color1() -> Color {
    Color::from_hex(0x8b160e)
}

fn default_color2() -> Color {
    Color::from_hex(0xee2311)
}

fn default_color3() -> Color {
    Color::from_hex(0xff245b)
}

fn default_hover_color() -> Color {
    Color::from_hex(0xffdd44)
}

fn default_point_size() -> f32 {
    1.6
}

fn default_hover_radius() -> f32 {
    12.0
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            color1: default_color1(),
            color2: default_color2(),
            color3: default_color3(),
            hover_color: default_hover_color(),
            point_size: default_point_size(),
            hover_radius: default_hover_radius(),
        }
    }
}

impl ParticleSettings {
    pub fn validate(&self) -> Result<()> {
        check_positive("point_size", self.point_size)?;
        check_positive("hover_radius", self.hover_radius)
    }

    /// Colour model for these settings
    pub fn ramp(&self) -> ColorRamp {
        ColorRamp {
            color1: self.color1,
            color2: self.color2,
            color3: self.color3,
            hover: self.hover_color,
            hover_radius: self.hover_radius,
        }
    }
}

// =============================================================================
// Mesh asset
// =============================================================================

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AssetSettings {
    /// glTF/GLB model; `None` keeps the fallback shape forever
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Length of one animation cycle in seconds
    #[serde(default = "default_playback_duration")]
    pub playback_duration: f32,
    /// Transform of the group containing the model
    #[serde(default)]
    pub group: GroupTransform,
}

fn default_playback_duration() -> f32 {
    crate::animation::DEFAULT_PLAYBACK_PERIOD
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            path: None,
            playback_duration: default_playback_duration(),
            group: GroupTransform::default(),
        }
    }
}

impl AssetSettings {
    pub fn validate(&self) -> Result<()> {
        check_positive("playback_duration", self.playback_duration)?;
        self.group.validate()
    }
}

/// Scale, then rotate about Y, then translate
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GroupTransform {
    #[serde(default = "default_group_scale")]
    pub scale: f32,
    /// Rotation about the Y axis in radians
    #[serde(default = "default_group_rotation_y")]
    pub rotation_y: f32,
    #[serde(default = "default_group_translation")]
    pub translation: [f32; 3],
}

fn default_group_scale() -> f32 {
    0.5
}

fn default_group_rotation_y() -> f32 {
    std::f32::consts::FRAC_PI_2
}

fn default_group_translation() -> [f32; 3] {
    [0.0, -30.0, 0.0]
}

impl Default for GroupTransform {
    fn default() -> Self {
        Self {
            scale: default_group_scale(),
            rotation_y: default_group_rotation_y(),
            translation: default_group_translation(),
        }
    }
}

impl GroupTransform {
    pub fn validate(&self) -> Result<()> {
        check_positive("group.scale", self.scale)?;
        check_finite("group.rotation_y", self.rotation_y)?;
        for (axis, value) in ["x", "y", "z"].iter().zip(self.translation) {
            check_finite(&format!("group.translation.{}", axis), value)?;
        }
        Ok(())
    }

    /// Group-to-world matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.rotation_y),
            Vec3::from_array(self.translation),
        )
    }
}

// =============================================================================
// Fallback shape
// =============================================================================

/// Target shape used until (or instead of) the mesh asset
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FallbackShape {
    /// Solid ball of uniformly distributed points
    Sphere {
        #[serde(default = "default_sphere_radius")]
        radius: f32,
    },
    /// Procedural galloping-horse outline
    Silhouette {
        #[serde(default = "default_silhouette_scale")]
        scale: f32,
        #[serde(default = "default_silhouette_seed")]
        seed: u64,
    },
    /// Points sampled from the coloured pixels of an image
    Image {
        path: PathBuf,
        #[serde(default = "default_image_threshold")]
        threshold: u8,
        #[serde(default = "default_image_scale")]
        scale: f32,
    },
}

fn default_sphere_radius() -> f32 {
    50.0
}

fn default_silhouette_scale() -> f32 {
    80.0
}

fn default_silhouette_seed() -> u64 {
    42
}

fn default_image_threshold() -> u8 {
    128
}

fn default_image_scale() -> f32 {
    100.0
}

impl Default for FallbackShape {
    fn default() -> Self {
        FallbackShape::Sphere {
            radius: default_sphere_radius(),
        }
    }
}

impl FallbackShape {
    pub fn validate(&self) -> Result<()> {
        match self {
            FallbackShape::Sphere { radius } => check_positive("fallback.radius", *radius),
            FallbackShape::Silhouette { scale, .. } | FallbackShape::Image { scale, .. } => {
                check_positive("fallback.scale", *scale)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = SpiritConfig::from_toml_str("").unwrap();
        assert_eq!(config, SpiritConfig::default());
        assert_eq!(config.simulator.amount, 65_536);
        assert_eq!(config.simulator.attraction, 2.6);
        assert_eq!(config.particles.color2.to_hex(), 0xee2311);
        assert_eq!(config.fallback, FallbackShape::Sphere { radius: 50.0 });
        assert!(!config.follow_pointer);
    }

    #[test]
    fn test_partial_document() {
        let config = SpiritConfig::from_toml_str(
            r##"
            follow_pointer = true

            [simulator]
            amount = 250000
            die_speed = 0.01

            [particles]
            hover_color = "#00ff00"

            [asset]
            path = "assets/horse.glb"

            [fallback]
            kind = "image"
            path = "horse.png"
            threshold = 90
            "##,
        )
        .unwrap();

        assert!(config.follow_pointer);
        assert_eq!(config.simulator.amount, 250_000);
        assert_eq!(config.simulator.die_speed, 0.01);
        assert_eq!(config.simulator.speed, 0.5);
        assert_eq!(config.particles.hover_color.to_hex(), 0x00ff00);
        assert_eq!(
            config.asset.path.as_deref(),
            Some(Path::new("assets/horse.glb"))
        );
        assert_eq!(
            config.fallback,
            FallbackShape::Image {
                path: PathBuf::from("horse.png"),
                threshold: 90,
                scale: 100.0,
            }
        );
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            SpiritConfig::from_toml_str("[simulator]\namount = 0"),
            Err(SpiritError::Config(_))
        ));
        assert!(matches!(
            SpiritConfig::from_toml_str("[simulator]\namount = 4294967295"),
            Err(SpiritError::Config(_))
        ));
        assert!(matches!(
            SpiritConfig::from_toml_str("[simulator]\namount = 268435457"),
            Err(SpiritError::Config(_))
        ));
        assert!(SpiritConfig::from_toml_str("[simulator]\namount = 268435456").is_ok());
        assert!(matches!(
            SpiritConfig::from_toml_str("[simulator]\ndie_speed = -1.0"),
            Err(SpiritError::Config(_))
        ));
        assert!(matches!(
            SpiritConfig::from_toml_str("[asset]\nplayback_duration = 0.0"),
            Err(SpiritError::Config(_))
        ));
        assert!(matches!(
            SpiritConfig::from_toml_str("[particles]\ncolor1 = \"red\""),
            Err(SpiritError::Toml(_))
        ));
    }

    #[test]
    fn test_group_matrix() {
        let m = GroupTransform::default().matrix();
        // +X in model space: scaled by 0.5, rotated to -Z, lowered by 30
        let p = m.transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert!((p - Vec3::new(0.0, -30.0, -1.0)).length() < 1e-5);
    }
}
