// ============================================================
// Layer 4 — Batch Supplier
// ============================================================
// Wraps a Subset in Burn's DataLoader:
//   - fixed batch size (the last batch of a pass may be smaller)
//   - optional shuffling; Burn draws a fresh permutation every
//     time `.iter()` starts a new pass
//   - zero worker threads: batches are fetched and transformed
//     on the calling thread
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};
use std::sync::Arc;

use crate::data::batcher::{ShapeBatch, ShapeBatcher};
use crate::data::dataset::Subset;

pub type ShapeLoader<B> = Arc<dyn DataLoader<B, ShapeBatch<B>>>;

/// Build a single-threaded loader over `subset`.
///
/// `shuffle_seed` enables per-pass shuffling seeded from the given value.
pub fn build_loader<B: Backend>(
    subset:       Subset,
    batch_size:   usize,
    shuffle_seed: Option<u64>,
) -> ShapeLoader<B> {
    let builder = DataLoaderBuilder::<B, _, _>::new(ShapeBatcher)
        .batch_size(batch_size)
        .num_workers(0);

    match shuffle_seed {
        Some(seed) => builder.shuffle(seed).build(subset),
        None       => builder.build(subset),
    }
}
