// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two external collaborators of the training pipeline:
//
//   BitmapSource  → hands out one category's raw bitmaps
//   ArtifactSink  → turns a trained predictor into a file
//
// The application layer only sees these traits, so tests can
// swap in an in-memory source without touching the network.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::domain::category::Category;
use crate::domain::sample::BitmapArray;

// ─── BitmapSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the raw bitmaps of a category.
///
/// Implementations:
///   - QuickDrawSource → downloads and caches QuickDraw .npy files
pub trait BitmapSource {
    /// Retrieve every available bitmap for `category`.
    fn fetch(&self, category: Category) -> Result<BitmapArray>;
}

// ─── ArtifactSink ─────────────────────────────────────────────────────────────
/// Any component that can serialise a trained predictor `M` into
/// a deployable file.
///
/// Implementations:
///   - OnnxExporter → writes an ONNX inference graph
pub trait ArtifactSink<M> {
    /// Write `model` under `dir` and return the path of the file.
    fn export(&self, model: &M, dir: &Path) -> Result<PathBuf>;
}
