//! Shared helpers for GPU integration tests

use spirit_gpu::GpuContext;
use std::sync::Once;

static INIT: Once = Once::new();

/// Headless context, or `None` when the machine has no usable adapter
pub fn context() -> Option<GpuContext> {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });

    match GpuContext::headless_blocking() {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            tracing::warn!("Skipping GPU test: {}", err);
            None
        }
    }
}

/// Compare float buffers bit for bit
#[allow(dead_code)]
pub fn bits(data: &[f32]) -> Vec<u32> {
    data.iter().map(|v| v.to_bits()).collect()
}
