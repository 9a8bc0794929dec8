//! Procedural galloping-horse silhouette
//!
//! The outline is a weighted set of ellipses in a unit frame facing +X.
//! Points are drawn uniformly inside an ellipse chosen by
//! `weight * density`, with a thin depth jitter that grows for sparse parts.

use crate::sampler::RECORD_STRIDE;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

#[derive(Clone, Copy, Debug)]
struct Ellipse {
    cx: f32,
    cy: f32,
    rx: f32,
    ry: f32,
    weight: f32,
    density: f32,
}

const fn part(cx: f32, cy: f32, rx: f32, ry: f32, weight: f32, density: f32) -> Ellipse {
    Ellipse {
        cx,
        cy,
        rx,
        ry,
        weight,
        density,
    }
}

#[rustfmt::skip]
const PARTS: &[Ellipse] = &[
    // torso
    part(0.0, 0.0, 0.28, 0.16, 25.0, 1.2),
    part(0.05, 0.02, 0.26, 0.14, 20.0, 1.3),
    part(-0.05, 0.02, 0.24, 0.14, 18.0, 1.2),
    // chest
    part(0.2, 0.04, 0.12, 0.15, 12.0, 1.2),
    part(0.24, 0.06, 0.1, 0.13, 10.0, 1.1),
    // hindquarters
    part(-0.18, 0.02, 0.14, 0.16, 14.0, 1.2),
    part(-0.22, 0.04, 0.12, 0.14, 12.0, 1.1),
    // belly and back line
    part(0.0, -0.08, 0.22, 0.08, 8.0, 0.9),
    part(0.0, 0.12, 0.24, 0.04, 6.0, 1.0),
    // neck
    part(0.32, 0.12, 0.08, 0.14, 10.0, 1.1),
    part(0.36, 0.18, 0.07, 0.12, 9.0, 1.1),
    part(0.4, 0.24, 0.06, 0.1, 8.0, 1.0),
    part(0.43, 0.3, 0.055, 0.08, 7.0, 1.0),
    part(0.3, 0.06, 0.06, 0.08, 5.0, 0.9),
    part(0.34, 0.1, 0.05, 0.07, 4.0, 0.9),
    // head
    part(0.48, 0.36, 0.07, 0.06, 8.0, 1.2),
    part(0.52, 0.35, 0.06, 0.05, 6.0, 1.1),
    part(0.56, 0.34, 0.05, 0.04, 5.0, 1.0),
    // muzzle
    part(0.6, 0.32, 0.04, 0.03, 4.0, 1.0),
    part(0.64, 0.31, 0.03, 0.025, 3.0, 0.9),
    part(0.67, 0.3, 0.02, 0.02, 2.0, 0.8),
    // jaw, forehead, ears
    part(0.5, 0.32, 0.05, 0.03, 3.0, 0.9),
    part(0.47, 0.4, 0.04, 0.04, 4.0, 1.0),
    part(0.48, 0.44, 0.015, 0.035, 2.0, 1.2),
    part(0.46, 0.43, 0.015, 0.03, 2.0, 1.1),
    // front leg, reaching forward
    part(0.26, -0.06, 0.04, 0.08, 5.0, 1.0),
    part(0.3, -0.14, 0.035, 0.07, 4.0, 1.0),
    part(0.34, -0.22, 0.03, 0.06, 4.0, 0.95),
    part(0.38, -0.3, 0.025, 0.06, 3.0, 0.9),
    part(0.41, -0.38, 0.022, 0.05, 3.0, 0.85),
    part(0.44, -0.45, 0.025, 0.03, 2.0, 1.0),
    // front leg, folded under
    part(0.14, -0.08, 0.035, 0.07, 4.0, 0.95),
    part(0.12, -0.16, 0.03, 0.06, 3.0, 0.9),
    part(0.08, -0.24, 0.028, 0.06, 3.0, 0.85),
    part(0.05, -0.32, 0.025, 0.05, 3.0, 0.8),
    part(0.03, -0.4, 0.022, 0.025, 2.0, 0.9),
    // hind leg, pushing off
    part(-0.22, -0.04, 0.05, 0.09, 6.0, 1.0),
    part(-0.28, -0.1, 0.04, 0.08, 5.0, 0.95),
    part(-0.34, -0.18, 0.035, 0.07, 4.0, 0.9),
    part(-0.4, -0.26, 0.03, 0.06, 4.0, 0.85),
    part(-0.46, -0.34, 0.025, 0.05, 3.0, 0.8),
    part(-0.5, -0.42, 0.025, 0.03, 2.0, 0.9),
    // hind leg, swinging forward
    part(-0.12, -0.06, 0.04, 0.08, 5.0, 0.95),
    part(-0.1, -0.14, 0.035, 0.07, 4.0, 0.9),
    part(-0.06, -0.22, 0.03, 0.06, 3.0, 0.85),
    part(-0.02, -0.3, 0.025, 0.05, 3.0, 0.8),
    part(0.02, -0.38, 0.022, 0.025, 2.0, 0.85),
    // tail
    part(-0.3, 0.06, 0.06, 0.05, 4.0, 0.9),
    part(-0.38, 0.08, 0.07, 0.04, 5.0, 0.8),
    part(-0.48, 0.1, 0.08, 0.035, 5.0, 0.7),
    part(-0.58, 0.12, 0.07, 0.03, 4.0, 0.6),
    part(-0.68, 0.14, 0.06, 0.025, 3.0, 0.5),
    part(-0.76, 0.16, 0.05, 0.02, 2.0, 0.4),
    part(-0.5, 0.06, 0.06, 0.025, 2.0, 0.5),
    part(-0.6, 0.08, 0.05, 0.02, 2.0, 0.4),
    part(-0.55, 0.14, 0.05, 0.02, 2.0, 0.4),
    // mane
    part(0.38, 0.32, 0.08, 0.03, 4.0, 0.8),
    part(0.32, 0.34, 0.07, 0.025, 4.0, 0.7),
    part(0.26, 0.35, 0.06, 0.022, 3.0, 0.6),
    part(0.2, 0.34, 0.05, 0.02, 3.0, 0.5),
    part(0.14, 0.32, 0.04, 0.018, 2.0, 0.45),
    part(0.08, 0.3, 0.035, 0.015, 2.0, 0.4),
    part(0.3, 0.38, 0.05, 0.02, 2.0, 0.5),
    part(0.22, 0.38, 0.04, 0.018, 2.0, 0.45),
    // dust around body, legs, tail and mane
    part(0.0, 0.0, 0.45, 0.3, 4.0, 0.15),
    part(0.2, -0.35, 0.15, 0.1, 2.0, 0.2),
    part(-0.3, -0.3, 0.15, 0.1, 2.0, 0.2),
    part(-0.65, 0.12, 0.12, 0.06, 2.0, 0.25),
    part(0.25, 0.36, 0.1, 0.05, 2.0, 0.2),
];

/// `count` records outlining a galloping horse, `scale` units per frame unit
///
/// The same `seed` always yields the same points.
pub fn horse_silhouette(count: usize, scale: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut cumulative = Vec::with_capacity(PARTS.len());
    let mut total = 0.0f32;
    for part in PARTS {
        total += part.weight * part.density;
        cumulative.push(total);
    }

    let mut out = vec![0.0; count * RECORD_STRIDE];
    for record in out.chunks_exact_mut(RECORD_STRIDE) {
        let r = rng.random::<f32>() * total;
        let index = cumulative.partition_point(|&c| c < r).min(PARTS.len() - 1);
        let part = &PARTS[index];

        let angle = rng.random::<f32>() * TAU;
        let radius = rng.random::<f32>().sqrt();
        let x = part.cx + angle.cos() * radius * part.rx;
        let y = part.cy + angle.sin() * radius * part.ry;

        let depth = 0.1 + (1.0 - part.density) * 0.1;
        let z = (rng.random::<f32>() - 0.5) * depth;

        record[0] = x * scale;
        record[1] = y * scale;
        record[2] = z * scale;
        record[3] = rng.random();
    }
    out
}
