//! Pixel-level enhancement primitives
//!
//! All functions operate on interleaved RGBA buffers. Alpha is never touched.

/// Luma weights: Y = 0.299R + 0.587G + 0.114B
#[inline]
fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Mean luma-weighted brightness of an RGBA buffer.
pub fn luma_mean(pixels: &[u8]) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0u32;
    for px in pixels.chunks_exact(4) {
        sum += luma(px[0], px[1], px[2]);
        count += 1;
    }
    if count > 0 {
        sum / count as f32
    } else {
        0.0
    }
}

/// Pixel-wise gamma correction via a 256-entry LUT applied to R, G and B.
pub fn apply_gamma(pixels: &mut [u8], gamma: f32) {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let v = (i as f32 / 255.0).powf(1.0 / gamma) * 255.0;
        *entry = v.clamp(0.0, 255.0) as u8;
    }
    for px in pixels.chunks_exact_mut(4) {
        px[0] = lut[px[0] as usize];
        px[1] = lut[px[1] as usize];
        px[2] = lut[px[2] as usize];
    }
}

/// Simplified global contrast-limited histogram equalization.
///
/// The luma histogram is clipped at `clip_factor` times the uniform bin
/// height, the excess is redistributed uniformly, and the resulting CDF maps
/// each pixel's luma. RGB is rescaled by new/old luma to preserve color;
/// zero-luma pixels are left untouched (divide-by-zero guard).
pub fn apply_clahe(pixels: &mut [u8], clip_factor: f32) {
    let total_pixels = pixels.len() / 4;
    if total_pixels == 0 {
        return;
    }

    let mut histogram = [0u32; 256];
    for px in pixels.chunks_exact(4) {
        let l = luma(px[0], px[1], px[2]).round() as usize;
        histogram[l.min(255)] += 1;
    }

    let limit = ((clip_factor * total_pixels as f32 / 256.0).round() as u32).max(1);
    let mut excess = 0u64;
    let mut clipped = [0f64; 256];
    for i in 0..256 {
        if histogram[i] > limit {
            excess += (histogram[i] - limit) as u64;
            clipped[i] = limit as f64;
        } else {
            clipped[i] = histogram[i] as f64;
        }
    }

    let increase = excess as f64 / 256.0;
    let mut mapping = [0u8; 256];
    let mut cdf = 0.0f64;
    for i in 0..256 {
        cdf += clipped[i] + increase;
        let mapped = (cdf / total_pixels as f64 * 255.0).round();
        mapping[i] = mapped.clamp(0.0, 255.0) as u8;
    }

    for px in pixels.chunks_exact_mut(4) {
        let l = luma(px[0], px[1], px[2]).round();
        if l <= 0.0 {
            continue;
        }
        let l = (l as usize).min(255);
        let scale = mapping[l] as f32 / l as f32;
        px[0] = (px[0] as f32 * scale).clamp(0.0, 255.0) as u8;
        px[1] = (px[1] as f32 * scale).clamp(0.0, 255.0) as u8;
        px[2] = (px[2] as f32 * scale).clamp(0.0, 255.0) as u8;
    }
}

/// 3x3 sharpen convolution: center 5, four-neighbor -1, corners 0.
///
/// Reads every tap from `src` (an unmodified snapshot of the buffer) while
/// writing into `pixels`, so already-sharpened neighbors are never re-read.
/// The one-pixel border is left untouched.
pub fn apply_sharpen(pixels: &mut [u8], src: &[u8], width: usize, height: usize) {
    debug_assert_eq!(pixels.len(), width * height * 4);
    debug_assert_eq!(src.len(), pixels.len());
    if width < 3 || height < 3 {
        return;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = (y * width + x) * 4;
            for c in 0..3 {
                let tap = |ox: isize, oy: isize| -> f32 {
                    let nx = (x as isize + ox) as usize;
                    let ny = (y as isize + oy) as usize;
                    src[(ny * width + nx) * 4 + c] as f32
                };
                let v = 5.0 * tap(0, 0) - tap(0, -1) - tap(-1, 0) - tap(1, 0) - tap(0, 1);
                pixels[idx + c] = v.clamp(0.0, 255.0) as u8;
            }
        }
    }
}
