// ============================================================
// Layer 4 — Shape Batcher
// ============================================================
// Implements Burn's Batcher trait to stack transformed samples
// into one image tensor and one label tensor.
//
// How batching works here:
//   Input:  Vec of N ShapeItems, each with side*side pixels
//   Output: ShapeBatch with
//             images:  [N, 1, side, side]
//             targets: [N]
//
//   All pixels are flattened into one Vec<f32> and moved to the
//   device in a single transfer, then reshaped.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ShapeItem;

// ─── ShapeBatch ───────────────────────────────────────────────────────────────
/// A batch of upscaled drawings ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ShapeBatch<B: Backend> {
    /// Images, shape: [batch_size, 1, side, side]
    pub images: Tensor<B, 4>,

    /// Category labels, shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── ShapeBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug, Default)]
pub struct ShapeBatcher;

impl<B: Backend> Batcher<B, ShapeItem, ShapeBatch<B>> for ShapeBatcher {
    fn batch(&self, items: Vec<ShapeItem>, device: &B::Device) -> ShapeBatch<B> {
        let batch_size = items.len();
        let side       = items.first().map_or(0, |item| item.side);

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();

        let labels: Vec<i64> = items
            .iter()
            .map(|item| item.label as i64)
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), device)
            .reshape([batch_size, 1, side, side]);
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

        ShapeBatch { images, targets }
    }
}
