//! Deformable triangle mesh used as the sampling source
//!
//! The mesh is an opaque asset: base vertex positions, an optional triangle
//! index buffer and zero or more morph targets (per-vertex position deltas)
//! blended by scalar influences.

use crate::error::{Result, SpiritError};
use glam::{Mat4, Vec3};

/// Triangle mesh with morph-target support
#[derive(Clone, Debug)]
pub struct MeshSource {
    /// Mesh name (from the asset, if any)
    pub name: String,
    /// Base (non-morphed) vertex positions
    positions: Vec<Vec3>,
    /// Triangle indices (three per face); `None` means non-indexed triangles
    indices: Option<Vec<u32>>,
    /// Morph target position deltas, one buffer per target
    morph_targets: Vec<Vec<Vec3>>,
    /// Current influence of each morph target
    influences: Vec<f32>,
    /// Object-to-world transform of the mesh node
    transform: Mat4,
}

impl MeshSource {
    /// Create a non-indexed mesh from raw positions
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            name: "mesh".to_string(),
            positions,
            indices: None,
            morph_targets: Vec::new(),
            influences: Vec::new(),
            transform: Mat4::IDENTITY,
        }
    }

    /// Set the mesh name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the triangle index buffer
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Add a morph target with zero initial influence
    pub fn with_morph_target(mut self, deltas: Vec<Vec3>) -> Self {
        self.morph_targets.push(deltas);
        self.influences.push(0.0);
        self
    }

    /// Set the object-to-world transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Check index bounds and morph target sizes
    pub fn validate(&self) -> Result<()> {
        if self.positions.is_empty() {
            return Err(SpiritError::InvalidMesh("mesh has no position data".into()));
        }

        match &self.indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(SpiritError::InvalidMesh(format!(
                        "index count {} is not a multiple of 3",
                        indices.len()
                    )));
                }
                if let Some(&bad) = indices
                    .iter()
                    .find(|&&i| i as usize >= self.positions.len())
                {
                    return Err(SpiritError::InvalidMesh(format!(
                        "index {} out of range for {} vertices",
                        bad,
                        self.positions.len()
                    )));
                }
            }
            None => {
                if self.positions.len() % 3 != 0 {
                    return Err(SpiritError::InvalidMesh(format!(
                        "non-indexed vertex count {} is not a multiple of 3",
                        self.positions.len()
                    )));
                }
            }
        }

        for (target, deltas) in self.morph_targets.iter().enumerate() {
            if deltas.len() != self.positions.len() {
                return Err(SpiritError::InvalidMesh(format!(
                    "morph target {} has {} deltas, expected {}",
                    target,
                    deltas.len(),
                    self.positions.len()
                )));
            }
        }

        Ok(())
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Vertex indices of a triangle
    pub fn triangle(&self, face: usize) -> [usize; 3] {
        match &self.indices {
            Some(indices) => [
                indices[face * 3] as usize,
                indices[face * 3 + 1] as usize,
                indices[face * 3 + 2] as usize,
            ],
            None => [face * 3, face * 3 + 1, face * 3 + 2],
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Base position of a vertex
    pub fn base_position(&self, vertex: usize) -> Vec3 {
        self.positions[vertex]
    }

    /// Vertex position with every active morph target applied
    pub fn morphed_position(&self, vertex: usize) -> Vec3 {
        let mut position = self.positions[vertex];
        for (deltas, &influence) in self.morph_targets.iter().zip(&self.influences) {
            if influence == 0.0 {
                continue;
            }
            position += deltas[vertex] * influence;
        }
        position
    }

    /// Number of morph targets
    pub fn morph_target_count(&self) -> usize {
        self.morph_targets.len()
    }

    /// Current morph target influences
    pub fn influences(&self) -> &[f32] {
        &self.influences
    }

    /// Mutable morph target influences
    pub fn influences_mut(&mut self) -> &mut [f32] {
        &mut self.influences
    }

    /// Copy influences in; extra values are ignored, missing ones are zeroed
    pub fn set_influences(&mut self, weights: &[f32]) {
        for (i, influence) in self.influences.iter_mut().enumerate() {
            *influence = weights.get(i).copied().unwrap_or(0.0);
        }
    }

    /// Object-to-world transform
    pub fn transform(&self) -> Mat4 {
        self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshSource {
        MeshSource::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ])
        .with_indices(vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_triangle_lookup() {
        let mesh = quad();
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangle(1), [0, 2, 3]);

        let soup = MeshSource::new(vec![Vec3::ZERO; 6]);
        assert_eq!(soup.triangle_count(), 2);
        assert_eq!(soup.triangle(1), [3, 4, 5]);
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mesh = quad().with_indices(vec![0, 1, 7]);
        assert!(matches!(mesh.validate(), Err(SpiritError::InvalidMesh(_))));
    }

    #[test]
    fn test_validate_rejects_short_morph_target() {
        let mesh = quad().with_morph_target(vec![Vec3::ONE; 3]);
        assert!(matches!(mesh.validate(), Err(SpiritError::InvalidMesh(_))));
    }

    #[test]
    fn test_morph_accumulates_active_targets() {
        let mut mesh = quad()
            .with_morph_target(vec![Vec3::new(0.0, 0.0, 1.0); 4])
            .with_morph_target(vec![Vec3::new(2.0, 0.0, 0.0); 4]);

        assert_eq!(mesh.morphed_position(1), mesh.base_position(1));

        mesh.set_influences(&[0.5, 0.25]);
        let p = mesh.morphed_position(1);
        assert!((p - Vec3::new(1.5, 0.0, 0.5)).length() < 1e-6);

        mesh.set_influences(&[1.0]);
        assert_eq!(mesh.influences(), &[1.0, 0.0]);
    }
}
