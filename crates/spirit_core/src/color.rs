//! Particle colour model
//!
//! Colour is a three-stop gradient over the particle's life phase, blended
//! toward a hover colour near the pointer. The GPU particle shader evaluates
//! the same formula; this module is the CPU reference used by tests and
//! tooling.

use crate::error::SpiritError;
use crate::pointer::Pointer;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Linear RGB colour (0-1 per channel)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Colour from a packed `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    /// Parse `#rrggbb` or `rrggbb`
    pub fn parse_hex(text: &str) -> Result<Self, SpiritError> {
        let digits = text.trim().trim_start_matches('#');
        if digits.len() != 6 {
            return Err(SpiritError::Config(format!(
                "colour '{}' is not in #rrggbb form",
                text
            )));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::from_hex)
            .map_err(|_| SpiritError::Config(format!("colour '{}' is not valid hex", text)))
    }

    /// Packed `0xRRGGBB` value
    pub fn to_hex(&self) -> u32 {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// Linear interpolation between two colours
    pub fn lerp(a: &Color, b: &Color, t: f32) -> Color {
        Color {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
        }
    }

    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// RGBA array with opaque alpha, for uniform buffers
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, 1.0]
    }
}

impl TryFrom<String> for Color {
    type Error = SpiritError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        format!("#{:06x}", color.to_hex())
    }
}

/// GLSL-style smoothstep
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Gradient stops plus the pointer highlight
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRamp {
    pub color1: Color,
    pub color2: Color,
    pub color3: Color,
    pub hover: Color,
    /// Distance at which the highlight fades out completely
    pub hover_radius: f32,
}

impl ColorRamp {
    /// Gradient colour for a life phase (clamped to `[0, 1]`)
    pub fn gradient(&self, life: f32) -> Color {
        let t = life.clamp(0.0, 1.0);
        if t < 0.5 {
            Color::lerp(&self.color1, &self.color2, t * 2.0)
        } else {
            Color::lerp(&self.color2, &self.color3, (t - 0.5) * 2.0)
        }
    }

    /// Final particle colour at `position` given the current pointer
    pub fn shade(&self, life: f32, position: Vec3, pointer: &Pointer) -> Color {
        let base = self.gradient(life);
        if pointer.strength <= 0.0 {
            return base;
        }
        let dist = position.distance(pointer.position);
        let highlight = pointer.strength * (1.0 - smoothstep(0.0, self.hover_radius, dist));
        Color::lerp(&base, &self.hover, highlight)
    }
}
