//! Procedural target shapes used while no mesh is available

mod image;
mod silhouette;
mod sphere;

pub use self::image::ImageSampler;
pub use silhouette::horse_silhouette;
pub use sphere::sphere_points;

use crate::config::FallbackShape;
use crate::error::Result;
use rand::Rng;

/// Generate `count` fallback target records for `shape`
pub fn fallback_records<R: Rng>(shape: &FallbackShape, count: usize, rng: &mut R) -> Result<Vec<f32>> {
    let records = match shape {
        FallbackShape::Sphere { radius } => sphere_points(count, *radius, rng),
        FallbackShape::Silhouette { scale, seed } => horse_silhouette(count, *scale, *seed),
        FallbackShape::Image {
            path,
            threshold,
            scale,
        } => ImageSampler::open(path, *threshold)?.sample(count, *scale, rng),
    };
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpiritError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_every_shape_fills_the_buffer() {
        let mut rng = StdRng::seed_from_u64(0);
        for shape in [
            FallbackShape::default(),
            FallbackShape::Silhouette {
                scale: 80.0,
                seed: 42,
            },
        ] {
            let records = fallback_records(&shape, 100, &mut rng).unwrap();
            assert_eq!(records.len(), 400);
            assert!(records.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let shape = FallbackShape::Image {
            path: "does/not/exist.png".into(),
            threshold: 128,
            scale: 100.0,
        };
        let result = fallback_records(&shape, 10, &mut StdRng::seed_from_u64(0));
        assert!(matches!(
            result,
            Err(SpiritError::Image(_)) | Err(SpiritError::Io(_))
        ));
    }
}
