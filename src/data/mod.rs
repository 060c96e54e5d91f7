// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the remote .npy archives
// all the way to device-ready tensor batches.
//
// The pipeline flows in this order:
//
//   QuickDraw .npy files
//       │
//       ▼
//   QuickDrawSource   → downloads + caches, parses with npy
//       │
//       ▼
//   ShapeDataset      → sample index over resident 28x28 bitmaps
//       │
//       ▼
//   Partition         → disjoint train / val / test index lists
//       │
//       ▼
//   Subset            → implements Burn's Dataset trait
//       │                (each get() runs UpscaleTransform)
//       ▼
//   ShapeBatcher      → stacks samples into [N,1,56,56] tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Minimal .npy reader for QuickDraw bitmap archives
pub mod npy;

/// HTTP + disk-cache bitmap source
pub mod source;

/// 28 → 56 resampling with smoothing and sharpening
pub mod transform;

/// Sample index and subsets implementing Burn's Dataset trait
pub mod dataset;

/// Shuffles and splits indices into train/validation/test sets
pub mod splitter;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Single-threaded DataLoader construction
pub mod loader;
