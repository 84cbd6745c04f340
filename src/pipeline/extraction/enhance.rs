//! Image enhancement ahead of OCR.
//!
//! Every profile ends in a binarized image: grayscale in, strictly {0, 255} out.
//! The profiles differ only in the steps that run before thresholding:
//!
//! - `document`: non-local-means denoise, CLAHE (clip 2.0), adaptive threshold
//! - `handwriting`: CLAHE (clip 3.0), bilateral filter, adaptive threshold
//! - `default`: non-local-means denoise, adaptive threshold
//!
//! All operations are pure Rust over `image::GrayImage` and deterministic:
//! the same input and profile always yield byte-identical output.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, RgbImage};
use tracing::debug;

use super::ExtractionError;
use crate::models::EnhancementProfile;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Anything shorter cannot hold a recognizable image header.
const MIN_IMAGE_BYTES: usize = 16;

/// Filter strength for non-local-means denoising.
pub const DENOISE_STRENGTH: f32 = 3.0;
const DENOISE_PATCH_RADIUS: u32 = 3;
const DENOISE_SEARCH_RADIUS: u32 = 7;

pub const CLAHE_TILE_GRID: u32 = 8;
pub const DOCUMENT_CLAHE_CLIP: f32 = 2.0;
pub const HANDWRITING_CLAHE_CLIP: f32 = 3.0;

pub const BILATERAL_DIAMETER: u32 = 9;
pub const BILATERAL_SIGMA_COLOR: f32 = 75.0;
pub const BILATERAL_SIGMA_SPACE: f32 = 75.0;

pub const THRESHOLD_BLOCK_SIZE: u32 = 11;
pub const THRESHOLD_C: f32 = 2.0;

// ═══════════════════════════════════════════════════════════
// Profiles
// ═══════════════════════════════════════════════════════════

/// One operation in an enhancement recipe. Grayscale conversion is implicit
/// and always first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnhanceStep {
    Denoise { strength: f32 },
    Clahe { clip_limit: f32, tile_grid: u32 },
    Bilateral { diameter: u32, sigma_color: f32, sigma_space: f32 },
    AdaptiveThreshold { block_size: u32, c: f32 },
}

impl EnhanceStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Denoise { .. } => "denoise",
            Self::Clahe { .. } => "clahe",
            Self::Bilateral { .. } => "bilateral",
            Self::AdaptiveThreshold { .. } => "adaptive_threshold",
        }
    }

    fn apply(&self, img: &GrayImage) -> GrayImage {
        match *self {
            Self::Denoise { strength } => denoise_nl_means(
                img,
                strength,
                DENOISE_PATCH_RADIUS,
                DENOISE_SEARCH_RADIUS,
            ),
            Self::Clahe { clip_limit, tile_grid } => clahe(img, clip_limit, tile_grid),
            Self::Bilateral {
                diameter,
                sigma_color,
                sigma_space,
            } => bilateral_filter(img, diameter, sigma_color, sigma_space),
            Self::AdaptiveThreshold { block_size, c } => {
                adaptive_gaussian_threshold(img, block_size, c)
            }
        }
    }
}

const THRESHOLD: EnhanceStep = EnhanceStep::AdaptiveThreshold {
    block_size: THRESHOLD_BLOCK_SIZE,
    c: THRESHOLD_C,
};

const DENOISE: EnhanceStep = EnhanceStep::Denoise {
    strength: DENOISE_STRENGTH,
};

/// Ordered steps for a profile. The last step is always the adaptive threshold.
pub fn recipe(profile: EnhancementProfile) -> Vec<EnhanceStep> {
    match profile {
        EnhancementProfile::Document => vec![
            DENOISE,
            EnhanceStep::Clahe {
                clip_limit: DOCUMENT_CLAHE_CLIP,
                tile_grid: CLAHE_TILE_GRID,
            },
            THRESHOLD,
        ],
        EnhancementProfile::Handwriting => vec![
            EnhanceStep::Clahe {
                clip_limit: HANDWRITING_CLAHE_CLIP,
                tile_grid: CLAHE_TILE_GRID,
            },
            EnhanceStep::Bilateral {
                diameter: BILATERAL_DIAMETER,
                sigma_color: BILATERAL_SIGMA_COLOR,
                sigma_space: BILATERAL_SIGMA_SPACE,
            },
            THRESHOLD,
        ],
        EnhancementProfile::Default => vec![DENOISE, THRESHOLD],
    }
}

/// Enhance an image for OCR. Pure and deterministic.
pub fn enhance(image: &DynamicImage, profile: EnhancementProfile) -> GrayImage {
    let mut gray = rgb_to_gray(&image.to_rgb8());
    for step in recipe(profile) {
        debug!(
            profile = profile.as_str(),
            step = step.name(),
            width = gray.width(),
            height = gray.height(),
            "Enhancement step"
        );
        gray = step.apply(&gray);
    }
    gray
}

// ═══════════════════════════════════════════════════════════
// Decoding and orientation
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
/// Reject clearly invalid input before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Decode image bytes and apply the EXIF orientation, if any.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
    validate_image_bytes(bytes)?;
    let img = image::load_from_memory(bytes)
        .map_err(|e| ExtractionError::ImageProcessing(format!("Image decode failed: {e}")))?;
    Ok(apply_orientation(img, read_exif_orientation(bytes)))
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Encode a grayscale image as PNG for the OCR engine.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageLuma8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

// ═══════════════════════════════════════════════════════════
// Pixel operations
// ═══════════════════════════════════════════════════════════

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = (rgb.width(), rgb.height());
    let mut gray = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let p = rgb.get_pixel(x, y);
            let luma = (0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32)
                .round()
                .min(255.0) as u8;
            gray.put_pixel(x, y, Luma([luma]));
        }
    }
    gray
}

/// Non-local-means denoising.
///
/// Each pixel becomes a weighted mean of the pixels in its search window,
/// weighted by how similar their surrounding patches are:
/// `w = exp(-d / h²)` where `d` is the mean squared patch difference.
/// Patch distances come from one integer integral image per search offset,
/// so the cost is independent of the patch size. Borders replicate edge pixels.
pub fn denoise_nl_means(
    src: &GrayImage,
    strength: f32,
    patch_radius: u32,
    search_radius: u32,
) -> GrayImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let (w, h) = (w as usize, h as usize);
    let (pr, sr) = (patch_radius as usize, search_radius as usize);
    let pad = pr + sr;
    let padded = pad_replicate(src, pad);
    let pw = w + 2 * pad;

    let lut = nlm_weight_lut((strength * strength).max(f32::EPSILON));
    let patch = 2 * pr + 1;
    let area = (patch * patch) as u64;

    // Integral over the patch-covering region, (w + 2pr) x (h + 2pr).
    // Region (rx, ry) sits at padded (rx + sr, ry + sr).
    let (rw, rh) = (w + 2 * pr, h + 2 * pr);
    let stride = rw + 1;
    let mut integral = vec![0u64; stride * (rh + 1)];

    let mut acc = vec![0f32; w * h];
    let mut weights = vec![0f32; w * h];

    for dy in 0..=2 * sr {
        for dx in 0..=2 * sr {
            for ry in 0..rh {
                let a = &padded[(ry + sr) * pw + sr..][..rw];
                let b = &padded[(ry + dy) * pw + dx..][..rw];
                let (above, below) = integral.split_at_mut((ry + 1) * stride);
                let above = &above[ry * stride..];
                let row = &mut below[..stride];
                let mut row_sum = 0u64;
                for i in 0..rw {
                    let d = a[i] as i32 - b[i] as i32;
                    row_sum += (d * d) as u64;
                    row[i + 1] = above[i + 1] + row_sum;
                }
            }

            for y in 0..h {
                let top = &integral[y * stride..][..stride];
                let bottom = &integral[(y + patch) * stride..][..stride];
                let neighbors = &padded[(y + pr + dy) * pw + pr + dx..][..w];
                let acc_row = &mut acc[y * w..][..w];
                let weight_row = &mut weights[y * w..][..w];
                for x in 0..w {
                    let sum = bottom[x + patch] + top[x] - top[x + patch] - bottom[x];
                    let idx = (sum * NLM_LUT_SCALE / area) as usize;
                    if let Some(&weight) = lut.get(idx) {
                        acc_row[x] += weight * neighbors[x] as f32;
                        weight_row[x] += weight;
                    }
                }
            }
        }
    }

    // The zero offset always contributes weight 1, so weights are positive.
    let out: Vec<u8> = acc
        .iter()
        .zip(&weights)
        .map(|(a, wsum)| (a / wsum).round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(w as u32, h as u32, out).unwrap_or_else(|| src.clone())
}

/// Steps per unit of mean squared patch distance in the weight table.
const NLM_LUT_SCALE: u64 = 16;

/// `exp(-d / h2)` sampled at `d = i / NLM_LUT_SCALE`, up to where the weight
/// drops below 1e-6. Distances past the end contribute nothing.
fn nlm_weight_lut(h2: f32) -> Vec<f32> {
    let max_dist = h2 * 1e6f32.ln();
    let len = (max_dist * NLM_LUT_SCALE as f32).ceil() as usize + 1;
    (0..len)
        .map(|i| (-(i as f32 / NLM_LUT_SCALE as f32) / h2).exp())
        .collect()
}

/// Copy `src` into a buffer with `pad` replicated edge pixels on every side.
fn pad_replicate(src: &GrayImage, pad: usize) -> Vec<u8> {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let raw = src.as_raw();
    let (pw, ph) = (w + 2 * pad, h + 2 * pad);
    let mut out = Vec::with_capacity(pw * ph);
    for py in 0..ph {
        let sy = py.saturating_sub(pad).min(h - 1);
        let row = &raw[sy * w..][..w];
        out.extend(std::iter::repeat(row[0]).take(pad));
        out.extend_from_slice(row);
        out.extend(std::iter::repeat(row[w - 1]).take(pad));
    }
    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tile_grid`×`tile_grid` grid; each tile gets a
/// clipped, redistributed histogram equalization LUT. Pixels are mapped by
/// bilinear interpolation between the four nearest tile LUTs.
pub fn clahe(src: &GrayImage, clip_limit: f32, tile_grid: u32) -> GrayImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 || tile_grid == 0 {
        return src.clone();
    }

    let tile_w = ((w + tile_grid - 1) / tile_grid).max(1);
    let tile_h = ((h + tile_grid - 1) / tile_grid).max(1);
    let tiles_x = (w + tile_w - 1) / tile_w;
    let tiles_y = (h + tile_h - 1) / tile_h;

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            let (x1, y1) = ((x0 + tile_w).min(w), (y0 + tile_h).min(h));
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[src.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            luts.push(tile_lut(&mut hist, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    let axis = |pos: u32, tile: u32, count: u32| -> (u32, u32, f32) {
        let f = ((pos as f32 + 0.5) / tile as f32 - 0.5).max(0.0);
        let t0 = (f.floor() as u32).min(count - 1);
        let t1 = (t0 + 1).min(count - 1);
        (t0, t1, (f - t0 as f32).clamp(0.0, 1.0))
    };

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty0, ty1, ay) = axis(y, tile_h, tiles_y);
        for x in 0..w {
            let (tx0, tx1, ax) = axis(x, tile_w, tiles_x);
            let v = src.get_pixel(x, y).0[0] as usize;
            let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
            let top = lut(tx0, ty0) * (1.0 - ax) + lut(tx1, ty0) * ax;
            let bottom = lut(tx0, ty1) * (1.0 - ax) + lut(tx1, ty1) * ax;
            let value = top * (1.0 - ay) + bottom * ay;
            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Clip a tile histogram, redistribute the excess evenly, and build the
/// equalization LUT from its cumulative distribution.
fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }
        let bonus = excess / 256;
        let mut residual = excess % 256;
        for bin in hist.iter_mut() {
            *bin += bonus;
        }
        if residual > 0 {
            let step = (256 / residual).max(1) as usize;
            let mut i = 0;
            while residual > 0 && i < 256 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[i] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Edge-preserving bilateral filter on a grayscale image.
///
/// Neighbors within a circular window of `diameter` are weighted by spatial
/// distance (`sigma_space`) and intensity difference (`sigma_color`).
/// Out-of-bounds neighbors are skipped.
pub fn bilateral_filter(
    src: &GrayImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    let (w, h) = src.dimensions();
    let radius = (diameter / 2) as i64;
    if w == 0 || h == 0 || radius == 0 {
        return src.clone();
    }

    let space_coeff = -0.5 / (sigma_space * sigma_space).max(f32::EPSILON);
    let color_coeff = -0.5 / (sigma_color * sigma_color).max(f32::EPSILON);

    let mut kernel = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2 <= (radius * radius) as f32 {
                kernel.push((dx, dy, (r2 * space_coeff).exp()));
            }
        }
    }

    let mut color_weight = [0f32; 256];
    for (d, weight) in color_weight.iter_mut().enumerate() {
        *weight = ((d * d) as f32 * color_coeff).exp();
    }

    let (wi, hi) = (w as i64, h as i64);
    let mut out = GrayImage::new(w, h);
    for y in 0..hi {
        for x in 0..wi {
            let center = src.get_pixel(x as u32, y as u32).0[0];
            let mut sum = 0f32;
            let mut weight_sum = 0f32;
            for &(dx, dy, spatial) in &kernel {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= wi || ny >= hi {
                    continue;
                }
                let value = src.get_pixel(nx as u32, ny as u32).0[0];
                let weight = spatial * color_weight[value.abs_diff(center) as usize];
                sum += value as f32 * weight;
                weight_sum += weight;
            }
            let filtered = if weight_sum > 0.0 {
                (sum / weight_sum).round().clamp(0.0, 255.0) as u8
            } else {
                center
            };
            out.put_pixel(x as u32, y as u32, Luma([filtered]));
        }
    }
    out
}

/// Adaptive Gaussian threshold.
///
/// The local threshold is the Gaussian-weighted mean of the
/// `block_size`×`block_size` neighborhood minus `c`. Pixels strictly above it
/// become 255, the rest 0. Borders replicate edge pixels.
pub fn adaptive_gaussian_threshold(src: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let block = if block_size % 2 == 0 {
        block_size + 1
    } else {
        block_size
    }
    .max(3);

    let kernel = gaussian_kernel(block);
    let means = gaussian_blur(src, &kernel);

    let out: Vec<u8> = src
        .as_raw()
        .iter()
        .zip(&means)
        .map(|(&p, mean)| {
            if p as f32 > mean.round() - c {
                255
            } else {
                0
            }
        })
        .collect();
    GrayImage::from_raw(w, h, out).unwrap_or_else(|| src.clone())
}

/// Normalized 1-D Gaussian kernel of odd `size`, sigma derived from size
/// as `0.3 * ((size - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) as i64;
    let radius = size / 2;
    let sigma = 0.3 * ((size - 1) as f32 * 0.5 - 1.0) + 0.8;
    let coeff = -0.5 / (sigma * sigma);
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| ((i * i) as f32 * coeff).exp())
        .collect();
    let total: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= total;
    }
    kernel
}

/// Separable Gaussian blur with replicated borders, in f32.
fn gaussian_blur(src: &GrayImage, kernel: &[f32]) -> Vec<f32> {
    let (w, h) = (src.width() as i64, src.height() as i64);
    let r = kernel.len() as i64 / 2;
    let raw = src.as_raw();

    let mut horizontal = vec![0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0f32;
            for (i, k) in kernel.iter().enumerate() {
                let sx = (x + i as i64 - r).clamp(0, w - 1);
                sum += k * raw[(y * w + sx) as usize] as f32;
            }
            horizontal[(y * w + x) as usize] = sum;
        }
    }

    let mut out = vec![0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0f32;
            for (i, k) in kernel.iter().enumerate() {
                let sy = (y + i as i64 - r).clamp(0, h - 1);
                sum += k * horizontal[(sy * w + x) as usize];
            }
            out[(y * w + x) as usize] = sum;
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
