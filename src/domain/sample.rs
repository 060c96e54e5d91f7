// ============================================================
// Layer 3 — Bitmap and Sample Domain Types
// ============================================================
// A BitmapArray is one category's block of fixed-size grayscale
// bitmaps, stored as one contiguous Vec<u8>:
//
//   [img0 px0..px783][img1 px0..px783] ... [imgN px0..px783]
//
// A SampleKey names one bitmap inside that block without copying
// it; a LabeledSample pairs the key with its integer label.
//
// Reference: Rust Book §5 (Structs), §8 (Vectors and Slices)

use serde::{Deserialize, Serialize};

use crate::domain::category::Category;

/// Side length of a QuickDraw bitmap.
pub const SOURCE_SIZE: usize = 28;

/// Pixels in one QuickDraw bitmap (28 x 28).
pub const SOURCE_PIXELS: usize = SOURCE_SIZE * SOURCE_SIZE;

/// A contiguous block of `len()` square grayscale bitmaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapArray {
    pixels: Vec<u8>,
    side:   usize,
}

impl BitmapArray {
    /// Wrap a flat pixel buffer of `side x side` bitmaps.
    ///
    /// Fails if the buffer is not a whole number of bitmaps.
    pub fn new(pixels: Vec<u8>, side: usize) -> anyhow::Result<Self> {
        let per_image = side * side;
        if per_image == 0 || pixels.len() % per_image != 0 {
            anyhow::bail!(
                "Bitmap buffer of {} bytes is not a multiple of {}x{}",
                pixels.len(), side, side
            );
        }
        Ok(Self { pixels, side })
    }

    /// Number of bitmaps in the block.
    pub fn len(&self) -> usize {
        self.pixels.len() / (self.side * self.side)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Side length of each bitmap.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Borrow bitmap `index` as a row-major pixel slice.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        let per_image = self.side * self.side;
        let start     = index.checked_mul(per_image)?;
        self.pixels.get(start..start + per_image)
    }

    /// Keep only the first `cap` bitmaps and give the rest of the
    /// allocation back to the allocator.
    pub fn truncate(&mut self, cap: usize) {
        if cap < self.len() {
            self.pixels.truncate(cap * self.side * self.side);
            self.pixels.shrink_to_fit();
        }
    }
}

/// Identifies one raw bitmap: which category, and where inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleKey {
    pub category: Category,
    pub index:    usize,
}

/// A sample key with its label (the category's position in the
/// enumeration the index was built from).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub key:   SampleKey,
    pub label: usize,
}

impl LabeledSample {
    pub fn new(category: Category, index: usize, label: usize) -> Self {
        Self { key: SampleKey { category, index }, label }
    }
}
