// SPDX-License-Identifier: GPL-3.0-only

//! GPU integration tests
//!
//! These need a GPU adapter and are skipped (with a message) when none is
//! available.

use hdr_camera::backends::camera::Resolution;
use hdr_camera::config::{CameraSource, Config, EngineConfig};
use hdr_camera::engine::reference;
use hdr_camera::engine::{ComputeEngine, EngineBinding, ReinhardGlobalEngine};
use hdr_camera::gpu::GpuContext;
use hdr_camera::host::{HeadlessHost, RedrawSignal};
use hdr_camera::pipeline::{FramePipeline, PipelineSettings, TextureSlot};
use hdr_camera::render::GpuBackend;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

async fn gpu_or_skip() -> Option<GpuContext> {
    match GpuContext::headless("gpu_tests").await {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            println!("Skipping test (no GPU): {}", e);
            None
        }
    }
}

fn create_texture(gpu: &GpuContext, size: Resolution, usage: wgpu::TextureUsages) -> wgpu::Texture {
    gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("gpu_test_texture"),
        size: size.extent(),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage,
        view_formats: &[],
    })
}

/// Gradient with a bright highlight so the white point matters
fn test_image(size: Resolution) -> Vec<u8> {
    let mut data = Vec::with_capacity(size.pixel_count() * 4);
    for y in 0..size.height {
        for x in 0..size.width {
            let r = (x * 255 / size.width.max(1)) as u8;
            let g = (y * 255 / size.height.max(1)) as u8;
            let b = if x > size.width * 3 / 4 { 250 } else { 40 };
            data.extend_from_slice(&[r, g, b, 255]);
        }
    }
    data
}

#[tokio::test]
async fn test_reinhard_engine_matches_reference() {
    let Some(gpu) = gpu_or_skip().await else {
        return;
    };
    let size = Resolution::new(64, 48);
    let pixels = test_image(size);

    let input = create_texture(
        &gpu,
        size,
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    );
    let output = create_texture(
        &gpu,
        size,
        wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
    );
    gpu.queue().write_texture(
        input.as_image_copy(),
        &pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(size.width * 4),
            rows_per_image: Some(size.height),
        },
        size.extent(),
    );

    let key = 0.18;
    let saturation = 1.0;
    let mut engine = ReinhardGlobalEngine::new(key, saturation);
    engine
        .init(EngineBinding {
            gpu: gpu.clone(),
            resolution: size,
            input,
            output: output.clone(),
        })
        .unwrap();
    engine.process(true).unwrap();
    gpu.wait_idle().unwrap();

    let expected_stats = reference::compute_stats(&pixels, key);
    let stats = engine.read_stats().unwrap();
    assert_eq!(stats.pixel_count, size.pixel_count() as u32);
    assert!((stats.log_avg - expected_stats.log_avg).abs() < 1e-3);
    assert!((stats.max_lum - expected_stats.max_lum).abs() < 1e-3);

    let mapped = gpu.read_texture_rgba(&output).unwrap();
    let expected = reference::reinhard_global(&pixels, key, saturation);
    let worst = mapped
        .iter()
        .zip(expected.iter())
        .map(|(a, b)| a.abs_diff(*b))
        .max()
        .unwrap();
    assert!(worst <= 3, "GPU output differs from reference by {}", worst);

    engine.shutdown();
    assert!(!engine.is_initialized());
}

#[tokio::test]
async fn test_stale_stats_reused_without_recompute() {
    let Some(gpu) = gpu_or_skip().await else {
        return;
    };
    let size = Resolution::new(32, 32);
    let input = create_texture(
        &gpu,
        size,
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    );
    let output = create_texture(
        &gpu,
        size,
        wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
    );
    let layout = wgpu::TexelCopyBufferLayout {
        offset: 0,
        bytes_per_row: Some(size.width * 4),
        rows_per_image: Some(size.height),
    };
    let dark = vec![20u8; size.pixel_count() * 4];
    gpu.queue()
        .write_texture(input.as_image_copy(), &dark, layout, size.extent());

    let mut engine = ReinhardGlobalEngine::default();
    engine
        .init(EngineBinding {
            gpu: gpu.clone(),
            resolution: size,
            input: input.clone(),
            output,
        })
        .unwrap();
    // First pass computes statistics even when not asked to
    engine.process(false).unwrap();
    let first = engine.read_stats().unwrap();
    assert!(first.log_avg > 0.0);

    let bright = vec![220u8; size.pixel_count() * 4];
    gpu.queue()
        .write_texture(input.as_image_copy(), &bright, layout, size.extent());
    engine.process(false).unwrap();
    assert_eq!(engine.read_stats().unwrap(), first);

    engine.process(true).unwrap();
    assert!(engine.read_stats().unwrap().log_avg > first.log_avg);
}

fn wait_for_frames(host: &HeadlessHost, frames: u64) -> bool {
    let start = Instant::now();
    while host.frames_rendered() < frames {
        if start.elapsed() > Duration::from_secs(10) {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    true
}

fn pixel(image: &[u8], size: Resolution, x: u32, y: u32) -> [u8; 4] {
    let offset = ((y * size.width + x) * 4) as usize;
    [
        image[offset],
        image[offset + 1],
        image[offset + 2],
        image[offset + 3],
    ]
}

#[tokio::test]
async fn test_snapshot_is_upright() {
    let Some(gpu) = gpu_or_skip().await else {
        return;
    };

    // Top half red, bottom half blue
    let size = Resolution::new(640, 480);
    let image = image::RgbaImage::from_fn(size.width, size.height, |_, y| {
        if y < size.height / 2 {
            image::Rgba([255, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 255, 255])
        }
    });
    let path = std::env::temp_dir().join(format!("hdr-camera-upright-{}.png", std::process::id()));
    image.save(&path).unwrap();

    let config = Config {
        camera_resolution: size,
        display_resolution: size,
        camera: CameraSource::ImageFile { path: path.clone() },
        engine: EngineConfig::Passthrough,
        ..Config::default()
    };
    let host = HeadlessHost::start(config, gpu).unwrap();
    assert!(wait_for_frames(&host, 3), "pipeline produced no frames");

    let (snapshot_size, pixels) = host.snapshot().unwrap();
    let summary = host.stop();
    std::fs::remove_file(&path).ok();

    assert_eq!(snapshot_size, size);
    assert!(summary.frames_latched > 0);
    let top = pixel(&pixels, size, size.width / 2, 10);
    let bottom = pixel(&pixels, size, size.width / 2, size.height - 10);
    assert!(top[0] > 200 && top[2] < 50, "top should be red, got {:?}", top);
    assert!(bottom[2] > 200 && bottom[0] < 50, "bottom should be blue, got {:?}", bottom);
}

/// Reverse row order (storage order is bottom row first)
fn flip_rows(image: &[u8], size: Resolution) -> Vec<u8> {
    let stride = (size.width * 4) as usize;
    image.chunks_exact(stride).rev().flatten().copied().collect()
}

fn max_diff(a: &[u8], b: &[u8]) -> u8 {
    a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).max().unwrap_or(0)
}

/// Render passes until at least `frames` camera frames have been latched
fn render_until_latched(
    pipeline: &mut FramePipeline<GpuBackend>,
    redraws: &Receiver<()>,
    frames: u64,
) -> bool {
    let start = Instant::now();
    loop {
        let latched = pipeline.stages().map(|s| s.frames_latched()).unwrap_or(0);
        if latched >= frames {
            return true;
        }
        if start.elapsed() > Duration::from_secs(10) {
            return false;
        }
        if redraws.recv_timeout(Duration::from_millis(100)).is_ok() {
            pipeline.render_frame();
        }
    }
}

#[tokio::test]
async fn test_hdr_toggle_selects_composited_texture() {
    let Some(gpu) = gpu_or_skip().await else {
        return;
    };

    let size = Resolution::new(640, 480);
    let pixels = test_image(size);
    let image = image::RgbaImage::from_raw(size.width, size.height, pixels).unwrap();
    let path = std::env::temp_dir().join(format!("hdr-camera-toggle-{}.png", std::process::id()));
    image.save(&path).unwrap();

    let config = Config {
        camera_resolution: size,
        display_resolution: size,
        camera: CameraSource::ImageFile { path: path.clone() },
        process_hdr: false,
        ..Config::default()
    };
    let (redraw, redraws) = RedrawSignal::channel();
    let backend = GpuBackend::headless(gpu, &config);
    let mut pipeline = FramePipeline::new(backend, Arc::new(redraw), PipelineSettings::from(&config));
    pipeline.on_surface_created().unwrap();
    pipeline.on_surface_changed(size);
    assert_eq!(pipeline.preview_size(), Some(size));

    // HDR off: the display shows the raw texture
    assert!(render_until_latched(&mut pipeline, &redraws, 2), "no camera frames latched");
    let stages = pipeline.stages().unwrap();
    let raw = flip_rows(&stages.read_slot(TextureSlot::Raw).unwrap(), size);
    let (snapshot_size, off) = stages.snapshot().unwrap();
    assert_eq!(snapshot_size, size);
    assert_eq!(off.len(), raw.len());
    assert!(max_diff(&off, &raw) <= 1, "HDR off composite differs from raw by {}", max_diff(&off, &raw));

    // HDR on: the display shows the processed texture
    pipeline.set_hdr(true);
    assert!(pipeline.process_hdr());
    let latched = pipeline.stages().unwrap().frames_latched();
    assert!(render_until_latched(&mut pipeline, &redraws, latched + 2), "no camera frames latched");
    let stages = pipeline.stages().unwrap();
    let raw = flip_rows(&stages.read_slot(TextureSlot::Raw).unwrap(), size);
    let processed = flip_rows(&stages.read_slot(TextureSlot::Processed).unwrap(), size);
    let (_, on) = stages.snapshot().unwrap();
    assert!(max_diff(&on, &processed) <= 1, "HDR on composite differs from processed by {}", max_diff(&on, &processed));
    assert!(max_diff(&processed, &raw) > 10, "tone mapping left the image unchanged");
    assert!(max_diff(&on, &off) > 10, "composite did not change with HDR");

    pipeline.destroy();
    std::fs::remove_file(&path).ok();
}
