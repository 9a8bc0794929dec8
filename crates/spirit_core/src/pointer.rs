//! Pointer interaction state shared by the simulation and the renderer

use glam::Vec3;

/// World-space pointer with an interaction strength in `[0, 1]`
///
/// Zero strength means no interaction: no repulsion in the simulation and no
/// highlight in the particle colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointer {
    pub position: Vec3,
    pub strength: f32,
}

impl Pointer {
    /// No pointer contact
    pub const NONE: Pointer = Pointer {
        position: Vec3::ZERO,
        strength: 0.0,
    };

    /// Pointer at `position` with clamped `strength`
    pub fn new(position: Vec3, strength: f32) -> Self {
        let strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { position, strength }
    }

    /// Full-strength contact at `position`
    pub fn at(position: Vec3) -> Self {
        Self::new(position, 1.0)
    }

    /// Pointer left the surface or touch ended
    pub fn release(&mut self) {
        *self = Self::NONE;
    }

    /// Whether the pointer currently influences anything
    pub fn is_active(&self) -> bool {
        self.strength > 0.0
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::NONE
    }
}
