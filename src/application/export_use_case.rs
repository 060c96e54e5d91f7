// ============================================================
// Layer 2 — Export Use Case
// ============================================================
// Rebuilds the network from the latest checkpoint and writes the
// ONNX artifact again, without retraining.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::{Path, PathBuf};

use crate::domain::traits::ArtifactSink;
use crate::infra::{checkpoint::CheckpointManager, onnx::OnnxExporter};
use crate::ml::model::{ShapeCnn, ShapeCnnConfig};

pub struct ExportUseCase {
    artifact_dir: String,
    output_dir:   Option<String>,
}

impl ExportUseCase {
    /// `output_dir` defaults to the artifact directory.
    pub fn new(artifact_dir: String, output_dir: Option<String>) -> Self {
        Self { artifact_dir, output_dir }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<PathBuf> {
        let ckpt = CheckpointManager::new(&self.artifact_dir);
        let cfg  = ckpt.load_config()?;

        let model: ShapeCnn<B> = ShapeCnnConfig::new(cfg.categories.len())
            .with_image_size(cfg.image_size)
            .init(device);
        let model = ckpt.load_model(model, device)?;

        let out_dir  = self.output_dir.as_deref().unwrap_or(&self.artifact_dir);
        let exporter = OnnxExporter::new(cfg.image_size).with_file_name(&cfg.onnx_file);
        exporter
            .export(&model, Path::new(out_dir))
            .context("ONNX export failed")
    }
}
