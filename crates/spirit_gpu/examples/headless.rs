//! Headless Spirit run
//!
//! Simulates a few seconds of the swarm off-screen and prints the spread of
//! the particle cloud.
//!
//! ```text
//! cargo run -p spirit_gpu --example headless -- [config.toml] [model.glb]
//! ```

use anyhow::Context;
use glam::Vec3;
use spirit_core::SpiritConfig;
use spirit_gpu::{Camera, GpuContext, Spirit};

const FRAMES: u32 = 180;
const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mut config = match args.next() {
        Some(path) => SpiritConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => SpiritConfig::default(),
    };
    if let Some(model) = args.next() {
        config.asset.path = Some(model.into());
    }

    let ctx = GpuContext::headless_blocking().context("creating GPU device")?;
    let format = wgpu::TextureFormat::Rgba8UnormSrgb;
    let mut spirit = Spirit::new(&ctx, &config, format, Some(wgpu::TextureFormat::Depth32Float))?;

    let size = wgpu::Extent3d {
        width: WIDTH,
        height: HEIGHT,
        depth_or_array_layers: 1,
    };
    let color = ctx.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("Headless Color"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth = ctx.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("Headless Depth"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
    let camera = Camera::default().with_viewport(WIDTH, HEIGHT);

    // Orbit the pointer around the middle of the screen for the second half
    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            tracing::info!("Pointer enters");
        }
        if frame >= FRAMES / 2 {
            let angle = frame as f32 * 0.05;
            let x = WIDTH as f32 * (0.5 + 0.2 * angle.cos());
            let y = HEIGHT as f32 * (0.5 + 0.2 * angle.sin());
            if let Some(pointer) = camera.pointer_at(x, y) {
                spirit.set_pointer(pointer);
            }
        }

        spirit.tick(1.0 / 60.0)?;

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Headless Frame"),
            });
        spirit.render(&mut encoder, &color_view, Some(&depth_view), &camera)?;
        ctx.queue().submit(std::iter::once(encoder.finish()));
    }
    spirit.release_pointer();

    let positions = spirit
        .simulator()
        .position_texture()
        .read_pixels(&ctx)?;
    let (min, max) = positions.chunks_exact(4).fold(
        (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
        |(min, max), p| {
            let p = Vec3::new(p[0], p[1], p[2]);
            (min.min(p), max.max(p))
        },
    );

    println!(
        "{} particles after {:.2}s ({:?}): bounds {:?} .. {:?}",
        positions.len() / 4,
        spirit.clock().elapsed(),
        spirit.simulator().state().phase(),
        min,
        max
    );

    spirit.dispose();
    Ok(())
}
