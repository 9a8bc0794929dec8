//! Frame owner end to end

mod common;

use glam::Vec3;
use spirit_core::{Pointer, SpiritConfig};
use spirit_gpu::{Camera, GpuContext, Spirit};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn attachment(ctx: &GpuContext, format: wgpu::TextureFormat) -> wgpu::TextureView {
    ctx.device()
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Attachment"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn config() -> SpiritConfig {
    let mut config = SpiritConfig::default();
    config.simulator.amount = 1024;
    config
}

#[test]
fn test_ticks_and_renders_without_errors() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let mut spirit = Spirit::new(&ctx, &config(), COLOR_FORMAT, Some(DEPTH_FORMAT))?;
    let color = attachment(&ctx, COLOR_FORMAT);
    let depth = attachment(&ctx, DEPTH_FORMAT);
    let camera = Camera::default().with_viewport(64, 64);

    ctx.device().push_error_scope(wgpu::ErrorFilter::Validation);
    for _ in 0..5 {
        spirit.tick(1.0 / 60.0)?;
        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        spirit.render(&mut encoder, &color, Some(&depth), &camera)?;
        ctx.queue().submit(Some(encoder.finish()));
    }
    ctx.device().poll(wgpu::Maintain::Wait);
    let error = pollster::block_on(ctx.device().pop_error_scope());
    assert!(error.is_none(), "validation error: {:?}", error);

    assert!((spirit.clock().elapsed() - 5.0 / 60.0).abs() < 1e-5);
    assert_eq!(spirit.particles().instance_count(), 1024);

    spirit.dispose();
    Ok(())
}

#[test]
fn test_renderer_follows_the_written_slot() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let mut spirit = Spirit::new(&ctx, &config(), COLOR_FORMAT, None)?;
    assert_eq!(spirit.particles().slot(), spirit.simulator().current());

    for _ in 0..4 {
        let before = spirit.simulator().current();
        spirit.tick(1.0 / 60.0)?;
        assert_eq!(spirit.simulator().current(), before.other());
        assert_eq!(spirit.particles().slot(), spirit.simulator().current());
    }
    Ok(())
}

#[test]
fn test_long_frames_are_clamped() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let mut spirit = Spirit::new(&ctx, &config(), COLOR_FORMAT, None)?;
    spirit.tick(3.0)?;
    assert!((spirit.clock().elapsed() - 0.1).abs() < 1e-6);
    // init animation advanced by the clamped step only
    assert!((spirit.simulator().state().init_animation() - 0.05).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_pointer_reaches_both_halves() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let mut spirit = Spirit::new(&ctx, &config(), COLOR_FORMAT, None)?;

    let pointer = Pointer::at(Vec3::new(5.0, -2.0, 0.0));
    spirit.set_pointer(pointer);
    assert_eq!(spirit.simulator().state().pointer(), pointer);
    assert_eq!(spirit.particles().pointer(), pointer);

    spirit.release_pointer();
    assert_eq!(spirit.simulator().state().pointer(), Pointer::NONE);
    assert_eq!(spirit.particles().pointer(), Pointer::NONE);
    Ok(())
}

#[test]
fn test_depth_view_must_match_pipeline() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let spirit = Spirit::new(&ctx, &config(), COLOR_FORMAT, None)?;
    let color = attachment(&ctx, COLOR_FORMAT);
    let depth = attachment(&ctx, DEPTH_FORMAT);

    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    assert!(spirit
        .render(&mut encoder, &color, Some(&depth), &Camera::default())
        .is_err());
    Ok(())
}
