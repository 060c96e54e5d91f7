// ============================================================
// Layer 2 — Classify Use Case
// ============================================================
// Loads the latest checkpoint and classifies one picture file,
// preprocessed the way the browser client does it.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::Path;

use crate::data::transform::picture_to_input;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{Inferencer, Prediction};

pub struct ClassifyUseCase<B: Backend> {
    inferencer: Inferencer<B>,
}

impl<B: Backend> ClassifyUseCase<B> {
    pub fn new(artifact_dir: &str, device: B::Device) -> Result<Self> {
        let ckpt       = CheckpointManager::new(artifact_dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt, device)?;
        Ok(Self { inferencer })
    }

    pub fn classify_file(&self, path: &Path) -> Result<Prediction> {
        let picture = image::open(path)
            .with_context(|| format!("Cannot open image '{}'", path.display()))?;
        let pixels = picture_to_input(&picture, self.inferencer.image_size());
        self.inferencer.classify(&pixels)
    }
}
