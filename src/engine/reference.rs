// SPDX-License-Identifier: GPL-3.0-only

//! CPU implementation of the global Reinhard operator
//!
//! Mirrors `reinhard_global.wgsl` step for step on normalised RGBA8 data.
//! Used to check the GPU engine and for offline processing of snapshots.

use super::reinhard::ReinhardStats;

/// Rec. 709 luminance weights
pub const LUM_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Offset that keeps `ln(Y)` finite for black pixels
pub const LUM_EPSILON: f32 = 1e-6;

fn normalized_rgb(px: &[u8]) -> [f32; 3] {
    [
        px[0] as f32 / 255.0,
        px[1] as f32 / 255.0,
        px[2] as f32 / 255.0,
    ]
}

pub fn luminance(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUM_WEIGHTS[0] + rgb[1] * LUM_WEIGHTS[1] + rgb[2] * LUM_WEIGHTS[2]
}

/// Log-average and maximum luminance of an RGBA8 image
pub fn compute_stats(rgba: &[u8], key: f32) -> ReinhardStats {
    let mut log_sum = 0.0f64;
    let mut max_lum = 0.0f32;
    let mut count = 0u32;

    for px in rgba.chunks_exact(4) {
        let y = luminance(normalized_rgb(px));
        log_sum += f64::from((y + LUM_EPSILON).ln());
        max_lum = max_lum.max(y);
        count += 1;
    }

    let log_avg = (log_sum / f64::from(count.max(1))).exp() as f32;
    ReinhardStats {
        log_avg,
        l_white: key / log_avg * max_lum,
        max_lum,
        pixel_count: count,
    }
}

/// Tone-map one pixel with precomputed statistics
pub fn map_pixel(rgb: [f32; 3], stats: &ReinhardStats, key: f32, saturation: f32) -> [f32; 3] {
    let y = luminance(rgb);
    if y <= 0.0 {
        return [0.0; 3];
    }
    let l = key / stats.log_avg * y;
    let l_white = stats.l_white.max(LUM_EPSILON);
    let l_d = l * (1.0 + l / (l_white * l_white)) / (1.0 + l);
    rgb.map(|c| ((c / y).powf(saturation) * l_d).clamp(0.0, 1.0))
}

/// Apply the operator to a whole RGBA8 image (alpha becomes opaque)
pub fn reinhard_global(rgba: &[u8], key: f32, saturation: f32) -> Vec<u8> {
    let stats = compute_stats(rgba, key);
    let mut out = Vec::with_capacity(rgba.len());
    for px in rgba.chunks_exact(4) {
        let mapped = map_pixel(normalized_rgb(px), &stats, key, saturation);
        out.extend(mapped.map(|c| (c * 255.0).round() as u8));
        out.push(255);
    }
    out
}
