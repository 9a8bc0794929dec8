//! Target points sampled from the coloured pixels of an image

use crate::error::Result;
use crate::sampler::RECORD_STRIDE;
use glam::Vec2;
use image::RgbaImage;
use rand::Rng;
use std::path::Path;

/// Weighted pixel candidates extracted from an RGBA image
///
/// A pixel qualifies when it is mostly opaque and either its red channel is
/// above the threshold or it is darker than near-white. Darker pixels weigh more, so dense areas of the drawing get
/// more particles.
#[derive(Clone, Debug)]
pub struct ImageSampler {
    /// Candidate positions in `[-1, 1]²`, Y up
    points: Vec<Vec2>,
    cumulative: Vec<f32>,
    total: f32,
}

impl ImageSampler {
    /// Decode an image file and collect its candidates
    pub fn open(path: impl AsRef<Path>, threshold: u8) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        let sampler = Self::from_rgba(&image, threshold);
        tracing::debug!(
            "ImageSampler: {} candidate pixels in {} ({}x{})",
            sampler.len(),
            path.display(),
            image.width(),
            image.height()
        );
        Ok(sampler)
    }

    /// Collect candidates from decoded pixels
    pub fn from_rgba(image: &RgbaImage, threshold: u8) -> Self {
        let (width, height) = image.dimensions();
        let mut points = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0.0f32;

        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let brightness = (r as f32 + g as f32 + b as f32) / 3.0;
            let colored = a > 128 && (r > threshold || brightness < 200.0);
            if !colored {
                continue;
            }

            total += 1.0 + (255.0 - brightness) / 255.0;
            cumulative.push(total);
            points.push(Vec2::new(
                (x as f32 / width as f32 - 0.5) * 2.0,
                -(y as f32 / height as f32 - 0.5) * 2.0,
            ));
        }

        Self {
            points,
            cumulative,
            total,
        }
    }

    /// Number of candidate pixels
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `count` records scaled by `scale`
    ///
    /// With no candidates the points fall back to a uniform square.
    pub fn sample<R: Rng>(&self, count: usize, scale: f32, rng: &mut R) -> Vec<f32> {
        let mut out = vec![0.0; count * RECORD_STRIDE];
        for record in out.chunks_exact_mut(RECORD_STRIDE) {
            let base = if self.points.is_empty() {
                Vec2::new(
                    rng.random::<f32>() * 2.0 - 1.0,
                    rng.random::<f32>() * 2.0 - 1.0,
                )
            } else {
                let r = rng.random::<f32>() * self.total;
                let index = self
                    .cumulative
                    .partition_point(|&c| c < r)
                    .min(self.points.len() - 1);
                self.points[index]
            };

            let offset_x = (rng.random::<f32>() - 0.5) * 0.02;
            let offset_y = (rng.random::<f32>() - 0.5) * 0.02;
            let offset_z = (rng.random::<f32>() - 0.5) * 0.3;

            record[0] = (base.x + offset_x) * scale;
            record[1] = (base.y + offset_y) * scale;
            record[2] = offset_z * scale * 0.3;
            record[3] = rng.random();
        }
        out
    }
}
