// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the headless preview pipeline
//!
//! This module provides command-line functionality for:
//! - Running the preview loop for a fixed duration
//! - Saving a snapshot of the composited display
//! - Printing the effective configuration and GPU adapter

use chrono::Local;
use hdr_camera::backends::camera::Resolution;
use hdr_camera::config::{CameraSource, Config};
use hdr_camera::gpu::GpuContext;
use hdr_camera::host::HeadlessHost;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Overrides applied on top of the loaded configuration
#[derive(Debug, Default, clap::Args)]
pub struct ConfigOverrides {
    /// Configuration file (default: ~/.config/hdr-camera/config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start with HDR processing enabled
    #[arg(long)]
    pub hdr: bool,

    /// Camera resolution, e.g. 1920x1080
    #[arg(long)]
    pub camera_resolution: Option<Resolution>,

    /// Display resolution, e.g. 1280x720
    #[arg(long)]
    pub display_resolution: Option<Resolution>,

    /// Stream a still image instead of the synthetic test pattern
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Seconds between tone-mapping statistics recomputes
    #[arg(long)]
    pub recompute_interval: Option<f32>,
}

impl ConfigOverrides {
    fn resolve(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = Config::load(self.config.as_deref())?;
        if self.hdr {
            config.process_hdr = true;
        }
        if let Some(resolution) = self.camera_resolution {
            config.camera_resolution = resolution;
        }
        if let Some(resolution) = self.display_resolution {
            config.display_resolution = resolution;
        }
        if let Some(path) = &self.image {
            config.camera = CameraSource::ImageFile { path: path.clone() };
        }
        if let Some(interval) = self.recompute_interval {
            config.recompute_interval_secs = interval;
        }
        config.validate()?;
        Ok(config)
    }
}

fn create_gpu() -> Result<GpuContext, Box<dyn std::error::Error>> {
    let gpu = pollster::block_on(GpuContext::headless("hdr_camera_cli"))?;
    Ok(gpu)
}

/// Run the preview loop until `duration` elapses or Ctrl+C
pub fn run_preview(
    overrides: ConfigOverrides,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = overrides.resolve()?;
    let gpu = create_gpu()?;
    println!("GPU: {} ({:?})", gpu.info().adapter_name, gpu.info().backend);
    println!(
        "Camera: {}  Display: {}  HDR: {}",
        config.camera_resolution,
        config.display_resolution,
        if config.process_hdr { "on" } else { "off" }
    );

    let host = HeadlessHost::start(config, gpu)?;

    println!();
    println!("Running... (press Ctrl+C to stop early)");

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let start = Instant::now();
    let target_duration = Duration::from_secs(duration);

    while start.elapsed() < target_duration {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        let elapsed = start.elapsed().as_secs();
        print!(
            "\rRunning: {:02}:{:02}  frames: {}",
            elapsed / 60,
            elapsed % 60,
            host.frames_rendered()
        );
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    let summary = host.stop();
    let seconds = start.elapsed().as_secs_f64().max(f64::EPSILON);
    println!(
        "Rendered {} frames ({} camera frames latched), {:.1} fps average",
        summary.frames_rendered,
        summary.frames_latched,
        summary.frames_rendered as f64 / seconds
    );
    if let Some(fps) = summary.last_fps {
        println!("Last measured frame rate: {} fps", fps);
    }

    Ok(())
}

/// Render `frames` frames and save the composited display as PNG
pub fn take_snapshot(
    overrides: ConfigOverrides,
    frames: u64,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = overrides.resolve()?;
    let gpu = create_gpu()?;

    let output_path = match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            path
        }
        None => {
            let dir = get_default_snapshot_dir();
            std::fs::create_dir_all(&dir)?;
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            dir.join(format!("snapshot_{}.png", timestamp))
        }
    };

    let host = HeadlessHost::start(config, gpu)?;

    let timeout = snapshot_timeout(frames);
    let start = Instant::now();
    while host.frames_rendered() < frames.max(1) {
        if start.elapsed() > timeout {
            return Err(format!(
                "Timed out after {} of {} frames",
                host.frames_rendered(),
                frames
            )
            .into());
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    let (size, pixels) = host.snapshot()?;
    let summary = host.stop();

    save_png(&output_path, size, pixels)?;
    println!(
        "Snapshot saved: {} ({}, after {} frames)",
        output_path.display(),
        size,
        summary.frames_rendered
    );

    Ok(())
}

/// Generous window per frame before a snapshot gives up; saturates
fn snapshot_timeout(frames: u64) -> Duration {
    Duration::from_millis(5_000u64.saturating_add(frames.saturating_mul(100)))
}

/// Print the configuration that `run` would use
pub fn print_config(overrides: ConfigOverrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = overrides.resolve()?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

/// Print the GPU adapter the pipeline would run on
pub fn print_gpu_info() -> Result<(), Box<dyn std::error::Error>> {
    let gpu = create_gpu()?;
    let info = gpu.info();
    println!("Adapter: {}", info.adapter_name);
    println!("Backend: {:?}", info.backend);
    println!("Max texture size: {}", info.max_texture_dimension_2d);
    Ok(())
}

fn save_png(path: &Path, size: Resolution, pixels: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
    let image = image::RgbaImage::from_raw(size.width, size.height, pixels)
        .ok_or_else(|| format!("Snapshot buffer does not match {}", size))?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Default folder name for saving snapshots
const DEFAULT_SAVE_FOLDER: &str = "HDR Camera";

/// Get default snapshot directory
fn get_default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_timeout_scales_with_frames() {
        assert_eq!(snapshot_timeout(0), Duration::from_secs(5));
        assert_eq!(snapshot_timeout(10), Duration::from_secs(6));
    }

    #[test]
    fn test_snapshot_timeout_large_frame_counts() {
        // Frame counts past u32::MAX still extend the window
        let frames = u64::from(u32::MAX) + 1;
        assert_eq!(
            snapshot_timeout(frames),
            Duration::from_millis(5_000 + frames * 100)
        );
        assert_eq!(snapshot_timeout(u64::MAX), Duration::from_millis(u64::MAX));
    }
}
