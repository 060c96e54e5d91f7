// ============================================================
// Layer 4 — On-Demand Upscale Transform
// ============================================================
// Turns one 28x28 QuickDraw bitmap into a 56x56 model input.
// Nothing is cached: the dataset calls this on every access.
//
//   u8 bitmap (28x28)
//       │  normalise to [0,1]
//       ▼
//   Lanczos3 resize → 56x56
//       │
//       ▼
//   SMOOTH_MORE (5x5)   softens the resampling staircase
//       │
//       ▼
//   EDGE_ENHANCE (3x3)  restores stroke edges
//       │  renormalise to [0,1]
//       ▼
//   Vec<f32> of 56*56 values, row-major, one channel
//
// Kernel weights and border handling follow the classic PIL
// ImageFilter definitions: the outer ring of pixels the kernel
// cannot cover is copied through unchanged.
//
// Reference: image crate documentation (imageops::resize)

use image::{
    imageops::{self, FilterType},
    DynamicImage, GrayImage, ImageBuffer, Luma,
};

/// Side length of the model input.
pub const TARGET_SIZE: usize = 56;

/// A square convolution kernel with an integer-style divisor.
#[derive(Debug, Clone, Copy)]
pub struct Kernel<const N: usize> {
    pub weights: [[f32; N]; N],
    pub scale:   f32,
}

/// 5x5 smoothing kernel, centre-weighted (scale 100).
pub const SMOOTH_MORE: Kernel<5> = Kernel {
    weights: [
        [1.0, 1.0,  1.0, 1.0, 1.0],
        [1.0, 5.0,  5.0, 5.0, 1.0],
        [1.0, 5.0, 44.0, 5.0, 1.0],
        [1.0, 5.0,  5.0, 5.0, 1.0],
        [1.0, 1.0,  1.0, 1.0, 1.0],
    ],
    scale: 100.0,
};

/// 3x3 edge-enhancing kernel (scale 2).
pub const EDGE_ENHANCE: Kernel<3> = Kernel {
    weights: [
        [-1.0, -1.0, -1.0],
        [-1.0, 10.0, -1.0],
        [-1.0, -1.0, -1.0],
    ],
    scale: 2.0,
};

impl<const N: usize> Kernel<N> {
    /// Convolve a grayscale image. Output values are rounded and
    /// clamped to u8.
    pub fn apply(&self, img: &GrayImage) -> GrayImage {
        let (w, h) = img.dimensions();
        let r      = (N / 2) as u32;
        let mut out = img.clone();

        if w <= 2 * r || h <= 2 * r {
            return out;
        }

        for y in r..h - r {
            for x in r..w - r {
                let mut acc = 0.0f32;
                for (ky, row) in self.weights.iter().enumerate() {
                    for (kx, weight) in row.iter().enumerate() {
                        let px = img.get_pixel(x + kx as u32 - r, y + ky as u32 - r)[0];
                        acc += weight * px as f32;
                    }
                }
                let v = (acc / self.scale).round().clamp(0.0, 255.0) as u8;
                out.put_pixel(x, y, Luma([v]));
            }
        }
        out
    }
}

/// Deterministic 28 → 56 upscaler with smoothing and sharpening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscaleTransform {
    source_size: u32,
    target_size: u32,
}

impl Default for UpscaleTransform {
    fn default() -> Self {
        Self::new(crate::domain::sample::SOURCE_SIZE, TARGET_SIZE)
    }
}

impl UpscaleTransform {
    pub fn new(source_size: usize, target_size: usize) -> Self {
        Self { source_size: source_size as u32, target_size: target_size as u32 }
    }

    pub fn target_size(&self) -> usize {
        self.target_size as usize
    }

    /// Run the full pipeline and return normalised pixels.
    ///
    /// `bitmap` must hold `source_size²` row-major pixels.
    pub fn apply(&self, bitmap: &[u8]) -> Vec<f32> {
        let unit: Vec<f32> = bitmap.iter().map(|&p| p as f32 / 255.0).collect();
        normalise(&self.upscale(&unit))
    }

    /// Resample a [0,1] bitmap to the target size, then smooth
    /// and sharpen it.
    pub fn upscale(&self, unit: &[f32]) -> GrayImage {
        let side = self.source_size;
        debug_assert_eq!(unit.len(), (side * side) as usize, "bitmap is not {side}x{side}");
        let small: GrayImage = ImageBuffer::from_fn(side, side, |x, y| {
            let v = unit
                .get((y * side + x) as usize)
                .copied()
                .unwrap_or(0.0);
            Luma([(v * 255.0).round().clamp(0.0, 255.0) as u8])
        });

        let large = imageops::resize(&small, self.target_size, self.target_size, FilterType::Lanczos3);
        let large = SMOOTH_MORE.apply(&large);
        EDGE_ENHANCE.apply(&large)
    }
}

/// Convert an arbitrary picture into the model's input layout the
/// way the browser client does: resize to `size x size`, convert
/// to luminance, invert (QuickDraw strokes are white on black),
/// scale to [0,1].
pub fn picture_to_input(img: &DynamicImage, size: usize) -> Vec<f32> {
    let rgb = img
        .resize_exact(size as u32, size as u32, FilterType::Triangle)
        .to_rgb8();

    rgb.pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            let gray = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            1.0 - gray / 255.0
        })
        .collect()
}

fn normalise(img: &GrayImage) -> Vec<f32> {
    img.as_raw().iter().map(|&p| p as f32 / 255.0).collect()
}
