//! Particle index ↔ texture UV mapping
//!
//! Particles live on a square `size × size` grid, one texel each. Every slot
//! is filled and drawn; the requested count only decides `size`.

use glam::Vec2;

/// Largest side length a state texture may have
pub const MAX_GRID_SIZE: u32 = 16384;

/// Square particle grid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticleGrid {
    size: u32,
}

impl ParticleGrid {
    /// Smallest square grid holding `requested` particles
    pub fn for_count(requested: u32) -> Self {
        let mut size = (requested as f64).sqrt().ceil() as u32;
        // guard against sqrt rounding down on perfect squares near u32::MAX
        while (size as u64) * (size as u64) < requested as u64 {
            size += 1;
        }
        Self { size: size.max(1) }
    }

    /// Grid with an explicit side length
    pub fn with_size(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    /// Side length in texels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of slots (`size²`)
    pub fn len(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Always false; a grid has at least one slot
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Texel-centre UV of particle `index` (row-major: `index = i * size + j`)
    pub fn uv(&self, index: usize) -> Vec2 {
        let size = self.size as usize;
        let i = index / size;
        let j = index % size;
        Vec2::new(
            (j as f32 + 0.5) / self.size as f32,
            (i as f32 + 0.5) / self.size as f32,
        )
    }

    /// Particle index of the texel containing `uv`
    pub fn index_of(&self, uv: Vec2) -> usize {
        let size = self.size as f32;
        let j = ((uv.x * size).floor() as usize).min(self.size as usize - 1);
        let i = ((uv.y * size).floor() as usize).min(self.size as usize - 1);
        i * self.size as usize + j
    }

    /// Interleaved `(u, v)` pairs for every slot, in index order
    pub fn uv_buffer(&self) -> Vec<[f32; 2]> {
        (0..self.len()).map(|index| self.uv(index).to_array()).collect()
    }
}
