//! Area-weighted surface sampling of a morphing mesh
//!
//! Face areas are computed once from the base (non-morphed) positions; each
//! sample picks a face by area, morphs that face's three vertices and
//! interpolates a uniformly distributed barycentric point.
//!
//! Output records are `(x, y, z, seed)` with a fresh life seed in `[0, 1)`.

use crate::error::{Result, SpiritError};
use crate::mesh::MeshSource;
use glam::{Mat4, Vec3};
use rand::Rng;

/// Floats per output record (x, y, z, seed)
pub const RECORD_STRIDE: usize = 4;

/// Per-face areas plus a running cumulative total
#[derive(Clone, Debug)]
pub struct FaceAreaTable {
    areas: Vec<f32>,
    cumulative: Vec<f32>,
    total: f32,
}

impl FaceAreaTable {
    /// Build the table from the mesh's base topology
    pub fn from_mesh(mesh: &MeshSource) -> Result<Self> {
        let face_count = mesh.triangle_count();
        if face_count == 0 {
            return Err(SpiritError::DegenerateMesh("mesh has no triangles".into()));
        }

        let mut areas = Vec::with_capacity(face_count);
        let mut cumulative = Vec::with_capacity(face_count);
        let mut total = 0.0f32;

        for face in 0..face_count {
            let [a, b, c] = mesh.triangle(face);
            let area = triangle_area(
                mesh.base_position(a),
                mesh.base_position(b),
                mesh.base_position(c),
            );
            areas.push(area);
            total += area;
            cumulative.push(total);
        }

        if !total.is_finite() || total <= 0.0 {
            return Err(SpiritError::DegenerateMesh(format!(
                "total surface area is {}",
                total
            )));
        }

        Ok(Self {
            areas,
            cumulative,
            total,
        })
    }

    /// Index of the first face whose cumulative area reaches `r`
    ///
    /// Ties resolve to the lowest index; draws past the end (rounding) clamp
    /// to the last face.
    pub fn select(&self, r: f32) -> usize {
        let index = self.cumulative.partition_point(|&c| c < r);
        index.min(self.cumulative.len() - 1)
    }

    /// Area of each face
    pub fn areas(&self) -> &[f32] {
        &self.areas
    }

    /// Cumulative area, parallel to `areas`
    pub fn cumulative(&self) -> &[f32] {
        &self.cumulative
    }

    /// Total surface area
    pub fn total(&self) -> f32 {
        self.total
    }

    /// Number of faces
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether the table has no faces (never true for a constructed table)
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// Area of triangle (a, b, c)
pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b - a).cross(c - a).length() * 0.5
}

/// Draw uniform barycentric weights `(w, u, v)` over a triangle
///
/// `u` and `v` are reflected when they land outside the unit triangle so the
/// pair stays uniform.
pub fn random_barycentric<R: Rng>(rng: &mut R) -> Vec3 {
    let mut u: f32 = rng.random();
    let mut v: f32 = rng.random();
    if u + v > 1.0 {
        u = 1.0 - u;
        v = 1.0 - v;
    }
    Vec3::new(1.0 - u - v, u, v)
}

/// A single point drawn from the surface
#[derive(Clone, Copy, Debug)]
pub struct SurfaceSample {
    /// Interpolated (morphed, object-space) position
    pub position: Vec3,
    /// Selected face index
    pub face: usize,
    /// Barycentric weights `(w, u, v)` for vertices (A, B, C)
    pub weights: Vec3,
    /// Fresh life seed in `[0, 1)`
    pub seed: f32,
}

/// Weighted-random point sampler over a morphing mesh
#[derive(Clone, Debug)]
pub struct SurfaceSampler {
    mesh: MeshSource,
    table: FaceAreaTable,
}

impl SurfaceSampler {
    /// Validate the mesh and precompute its face-area table
    pub fn new(mesh: MeshSource) -> Result<Self> {
        mesh.validate()?;
        let table = FaceAreaTable::from_mesh(&mesh)?;

        tracing::debug!(
            "SurfaceSampler: {} faces, {} morph targets, total area {:.3}",
            table.len(),
            mesh.morph_target_count(),
            table.total()
        );

        Ok(Self { mesh, table })
    }

    /// The sampled mesh
    pub fn mesh(&self) -> &MeshSource {
        &self.mesh
    }

    /// Mutable access, e.g. to drive morph influences
    pub fn mesh_mut(&mut self) -> &mut MeshSource {
        &mut self.mesh
    }

    /// The face-area table
    pub fn table(&self) -> &FaceAreaTable {
        &self.table
    }

    /// Draw one surface point
    pub fn sample_point<R: Rng>(&self, rng: &mut R) -> SurfaceSample {
        let r = rng.random::<f32>() * self.table.total();
        let face = self.table.select(r);
        let [a, b, c] = self.mesh.triangle(face);

        let va = self.mesh.morphed_position(a);
        let vb = self.mesh.morphed_position(b);
        let vc = self.mesh.morphed_position(c);

        let weights = random_barycentric(rng);
        let position = va * weights.x + vb * weights.y + vc * weights.z;

        SurfaceSample {
            position,
            face,
            weights,
            seed: rng.random(),
        }
    }

    /// Draw `count` records `(x, y, z, seed)` into a new buffer
    pub fn sample<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<f32> {
        let mut out = vec![0.0; count * RECORD_STRIDE];
        self.sample_into(&mut out, rng);
        out
    }

    /// Fill an existing record buffer; its length decides the sample count
    pub fn sample_into<R: Rng>(&self, out: &mut [f32], rng: &mut R) {
        for record in out.chunks_exact_mut(RECORD_STRIDE) {
            let sample = self.sample_point(rng);
            record[0] = sample.position.x;
            record[1] = sample.position.y;
            record[2] = sample.position.z;
            record[3] = sample.seed;
        }
    }
}

/// Apply a point transform to the xyz of every record, leaving seeds intact
pub fn transform_records(records: &mut [f32], matrix: Mat4) {
    for record in records.chunks_exact_mut(RECORD_STRIDE) {
        let p = matrix.transform_point3(Vec3::new(record[0], record[1], record[2]));
        record[0] = p.x;
        record[1] = p.y;
        record[2] = p.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Two disjoint right triangles with areas 1 and 3
    fn two_faces() -> MeshSource {
        let s = 2.0f32.sqrt();
        let t = 6.0f32.sqrt();
        MeshSource::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(s, 0.0, 0.0),
            Vec3::new(0.0, s, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0 + t, 0.0, 0.0),
            Vec3::new(10.0, t, 0.0),
        ])
    }

    #[test]
    fn test_face_area_table() {
        let table = FaceAreaTable::from_mesh(&two_faces()).unwrap();
        assert!((table.areas()[0] - 1.0).abs() < 1e-5);
        assert!((table.areas()[1] - 3.0).abs() < 1e-5);
        assert!((table.total() - 4.0).abs() < 1e-5);
        assert_eq!(table.cumulative()[1], table.total());
        assert!(table.cumulative()[1] >= table.cumulative()[0]);
    }

    #[test]
    fn test_select_tie_breaks_to_lowest_index() {
        let mesh = MeshSource::new(vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            // zero-area sliver between two real faces
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
        ]);
        let table = FaceAreaTable::from_mesh(&mesh).unwrap();
        let first = table.cumulative()[0];
        assert_eq!(table.select(first), 0);
        assert_eq!(table.select(0.0), 0);
        assert_eq!(table.select(first + 1e-4), 2);
        // past the end from rounding
        assert_eq!(table.select(table.total() * 2.0), 2);
    }

    #[test]
    fn test_degenerate_meshes_fail_fast() {
        let flat = MeshSource::new(vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0]);
        assert!(matches!(
            SurfaceSampler::new(flat),
            Err(SpiritError::DegenerateMesh(_))
        ));

        let empty = MeshSource::new(vec![Vec3::ZERO; 3]).with_indices(Vec::new());
        assert!(matches!(
            SurfaceSampler::new(empty),
            Err(SpiritError::DegenerateMesh(_))
        ));
    }

    #[test]
    fn test_face_frequency_matches_area() {
        let sampler = SurfaceSampler::new(two_faces()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let n = 10_000;
        let first = (0..n)
            .filter(|_| sampler.sample_point(&mut rng).face == 0)
            .count();
        let freq = first as f32 / n as f32;
        assert!((freq - 0.25).abs() < 0.02, "frequency {}", freq);
    }

    #[test]
    fn test_indexed_face_frequencies_follow_areas() {
        // areas 0.5, 2.0, 0.0, 1.5
        let mesh = MeshSource::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(0.0, 0.0, 3.0),
        ])
        .with_indices(vec![0, 1, 2, 1, 3, 4, 0, 1, 3, 0, 2, 5]);
        let sampler = SurfaceSampler::new(mesh).unwrap();
        let table = sampler.table();
        assert_eq!(table.areas()[2], 0.0);

        let n = 40_000;
        let mut counts = [0usize; 4];
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..n {
            counts[sampler.sample_point(&mut rng).face] += 1;
        }

        assert_eq!(counts[2], 0);
        for (face, &count) in counts.iter().enumerate() {
            let expected = table.areas()[face] / table.total();
            let freq = count as f32 / n as f32;
            assert!(
                (freq - expected).abs() < 0.015,
                "face {}: frequency {} expected {}",
                face,
                freq,
                expected
            );
        }
    }

    #[test]
    fn test_barycentric_weights_are_convex() {
        let sampler = SurfaceSampler::new(two_faces()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..5_000 {
            let s = sampler.sample_point(&mut rng);
            assert!(s.weights.x >= -1e-6 && s.weights.y >= 0.0 && s.weights.z >= 0.0);
            assert!((s.weights.x + s.weights.y + s.weights.z - 1.0).abs() < 1e-5);
            assert!((0.0..1.0).contains(&s.seed));
        }
    }

    #[test]
    fn test_zero_influence_matches_base_surface() {
        let base = two_faces();
        let morphing = two_faces().with_morph_target(vec![Vec3::new(0.0, 0.0, 5.0); 6]);

        let a = SurfaceSampler::new(base).unwrap();
        let b = SurfaceSampler::new(morphing).unwrap();

        let pa = a.sample(256, &mut StdRng::seed_from_u64(3));
        let pb = b.sample(256, &mut StdRng::seed_from_u64(3));
        assert_eq!(pa, pb);
        assert!(pb.chunks_exact(4).all(|r| r[2] == 0.0));
    }

    #[test]
    fn test_morphed_samples_follow_influence() {
        let mut sampler = SurfaceSampler::new(
            two_faces().with_morph_target(vec![Vec3::new(0.0, 0.0, 5.0); 6]),
        )
        .unwrap();
        sampler.mesh_mut().set_influences(&[0.5]);

        let records = sampler.sample(128, &mut StdRng::seed_from_u64(5));
        assert!(records.chunks_exact(4).all(|r| (r[2] - 2.5).abs() < 1e-5));
    }

    #[test]
    fn test_transform_records_keeps_seed() {
        let mut records = vec![1.0, 2.0, 3.0, 0.75];
        let m = Mat4::from_translation(Vec3::new(0.0, -30.0, 0.0))
            * Mat4::from_scale(Vec3::splat(0.5));
        transform_records(&mut records, m);
        assert_eq!(records, vec![0.5, -29.0, 1.5, 0.75]);
    }
}
