//! Off-screen driver against a real device

mod common;

use spirit_gpu::{
    CopyUniforms, FboHelper, GpuError, RenderTargetOptions, COPY_SHADER, STATE_FORMAT,
};

fn ramp_data(width: u32, height: u32) -> Vec<f32> {
    (0..width * height * 4)
        .map(|i| i as f32 * 0.37 - 11.0)
        .collect()
}

#[test]
fn test_copy_pass_is_idempotent() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let fbo = FboHelper::new(ctx.clone());

    let source = ramp_data(8, 8);
    let mut data = fbo.create_data_texture(source.clone(), 8, 8)?;
    assert!(data.upload(ctx.queue()));

    let target = fbo.create_render_target(8, 8, RenderTargetOptions::default())?;
    let copy = fbo.create_program::<CopyUniforms>("copy", COPY_SHADER, 1, STATE_FORMAT)?;
    copy.set_uniforms(
        ctx.queue(),
        &CopyUniforms {
            resolution: [8.0, 8.0, 0.0, 0.0],
        },
    );
    let bind_group = copy.bind(&ctx, &[&data])?;

    fbo.render(&copy, &bind_group, Some(&target))?;
    let first = target.read_pixels(&ctx)?;
    fbo.render(&copy, &bind_group, Some(&target))?;
    let second = target.read_pixels(&ctx)?;

    assert_eq!(common::bits(&first), common::bits(&second));
    assert_eq!(common::bits(&first), common::bits(&source));
    Ok(())
}

#[test]
fn test_data_texture_uploads_only_when_dirty() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let fbo = FboHelper::new(ctx.clone());

    let mut data = fbo.create_data_texture(vec![0.0; 4 * 4 * 4], 4, 4)?;
    assert!(data.is_dirty());
    assert!(data.upload(ctx.queue()));
    assert!(!data.upload(ctx.queue()));

    data.data_mut()[5] = 42.0;
    assert!(data.is_dirty());
    assert!(data.upload(ctx.queue()));

    let target = fbo.create_render_target(4, 4, RenderTargetOptions::default())?;
    let copy = fbo.create_program::<CopyUniforms>("copy", COPY_SHADER, 1, STATE_FORMAT)?;
    copy.set_uniforms(
        ctx.queue(),
        &CopyUniforms {
            resolution: [4.0, 4.0, 0.0, 0.0],
        },
    );
    fbo.render(&copy, &copy.bind(&ctx, &[&data])?, Some(&target))?;

    let pixels = target.read_pixels(&ctx)?;
    assert_eq!(pixels[5], 42.0);
    assert_eq!(pixels.iter().filter(|v| **v != 0.0).count(), 1);

    assert!(matches!(
        data.set_data(&[1.0; 3]),
        Err(GpuError::InvalidTarget(_))
    ));
    Ok(())
}

#[test]
fn test_render_target_options_are_validated() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let fbo = FboHelper::new(ctx.clone());

    let linear = RenderTargetOptions {
        min_filter: wgpu::FilterMode::Linear,
        mag_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    };
    // downlevel adapters may filter 32-bit floats
    let filterable = ctx
        .format_features(STATE_FORMAT)
        .flags
        .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE);
    let result = fbo.create_render_target(4, 4, linear);
    if filterable {
        assert!(result.is_ok());
    } else {
        assert!(matches!(result, Err(GpuError::InvalidTarget(_))));
    }

    // 8-bit colour filters fine
    let filtered = fbo.create_render_target(
        4,
        4,
        RenderTargetOptions {
            format: wgpu::TextureFormat::Rgba8Unorm,
            ..linear
        },
    )?;
    assert_eq!(filtered.format(), wgpu::TextureFormat::Rgba8Unorm);
    assert!(filtered.depth_view().is_none());

    let with_depth = fbo.create_render_target(
        4,
        4,
        RenderTargetOptions {
            depth_stencil: true,
            ..Default::default()
        },
    )?;
    assert!(with_depth.depth_view().is_some());

    assert!(matches!(
        fbo.create_render_target(0, 4, RenderTargetOptions::default()),
        Err(GpuError::InvalidTarget(_))
    ));
    assert!(matches!(
        fbo.create_data_texture(vec![0.0; 3], 1, 1),
        Err(GpuError::InvalidTarget(_))
    ));
    Ok(())
}

#[test]
fn test_targets_follow_adapter_capabilities() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    // a handed out context can always hold simulation state
    assert!(ctx.adapter().is_some());
    assert!(ctx.supports_state_targets());

    let fbo = FboHelper::new(ctx.clone());
    assert!(fbo
        .create_render_target(4, 4, RenderTargetOptions::default())
        .is_ok());

    let unrenderable = [
        wgpu::TextureFormat::Rgb9e5Ufloat,
        wgpu::TextureFormat::Bc1RgbaUnorm,
        wgpu::TextureFormat::Etc2Rgb8Unorm,
    ]
    .into_iter()
    .find(|format| {
        !ctx.format_features(*format)
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
    });
    if let Some(format) = unrenderable {
        let options = RenderTargetOptions {
            format,
            ..Default::default()
        };
        assert!(matches!(
            fbo.create_render_target(4, 4, options),
            Err(GpuError::InvalidTarget(_))
        ));
    }
    Ok(())
}

#[test]
fn test_screen_destination() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let mut fbo = FboHelper::new(ctx.clone());

    let source = ramp_data(2, 2);
    let mut data = fbo.create_data_texture(source.clone(), 2, 2)?;
    data.upload(ctx.queue());
    let copy = fbo.create_program::<CopyUniforms>("copy", COPY_SHADER, 1, STATE_FORMAT)?;
    copy.set_uniforms(
        ctx.queue(),
        &CopyUniforms {
            resolution: [2.0, 2.0, 0.0, 0.0],
        },
    );
    let bind_group = copy.bind(&ctx, &[&data])?;

    assert!(matches!(
        fbo.render(&copy, &bind_group, None),
        Err(GpuError::NoDestination)
    ));

    // Stand-in for a swapchain image
    let screen = fbo.create_render_target(2, 2, RenderTargetOptions::default())?;
    let view = screen
        .texture()
        .create_view(&wgpu::TextureViewDescriptor::default());
    fbo.set_screen_view(Some((view, STATE_FORMAT)));
    fbo.render(&copy, &bind_group, None)?;

    assert_eq!(common::bits(&screen.read_pixels(&ctx)?), common::bits(&source));
    Ok(())
}

#[test]
fn test_program_input_count_is_checked() -> anyhow::Result<()> {
    let Some(ctx) = common::context() else {
        return Ok(());
    };
    let fbo = FboHelper::new(ctx.clone());
    let copy = fbo.create_program::<CopyUniforms>("copy", COPY_SHADER, 1, STATE_FORMAT)?;
    assert_eq!(copy.input_count(), 1);
    assert!(copy.bind(&ctx, &[]).is_err());
    Ok(())
}
