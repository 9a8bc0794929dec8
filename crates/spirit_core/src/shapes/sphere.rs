use crate::sampler::RECORD_STRIDE;
use rand::Rng;
use std::f32::consts::TAU;

/// `count` records spread uniformly through a solid ball of `radius`
///
/// The cube root on the radial draw keeps the density uniform by volume.
pub fn sphere_points<R: Rng>(count: usize, radius: f32, rng: &mut R) -> Vec<f32> {
    let mut out = vec![0.0; count * RECORD_STRIDE];
    for record in out.chunks_exact_mut(RECORD_STRIDE) {
        let phi = rng.random::<f32>() * TAU;
        let theta = (2.0 * rng.random::<f32>() - 1.0).acos();
        let r = radius * rng.random::<f32>().cbrt();

        record[0] = r * theta.sin() * phi.cos();
        record[1] = r * theta.sin() * phi.sin();
        record[2] = r * theta.cos();
        record[3] = rng.random();
    }
    out
}
