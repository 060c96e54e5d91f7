// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores ShapeCnn weights with Burn's file recorder.
//
// What gets saved:
//   1. Model weights (.mpk file) after every epoch
//   2. latest_epoch.json        — which epoch was last saved
//   3. train_config.json        — the run's TrainConfig
//
// The config is needed to rebuild the network (class count,
// image size) before the weights can be loaded into it.
//
// Full precision is used: CompactRecorder stores f16, which
// shifts BatchNorm statistics enough to change predictions.
//
// File naming convention:
//   artifacts/
//     model_epoch_1.mpk     ← weights after epoch 1
//     model_epoch_2.mpk     ← weights after epoch 2
//     ...
//     latest_epoch.json
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{DefaultFileRecorder, FullPrecisionSettings},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::ShapeCnn;

type WeightRecorder = DefaultFileRecorder<FullPrecisionSettings>;

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        // .ok(): a real failure surfaces on the first write
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Write `{dir}/model_epoch_{epoch}.mpk` and point
    /// latest_epoch.json at it.
    pub fn save_model<B: Backend>(&self, model: &ShapeCnn<B>, epoch: usize) -> Result<()> {
        // Path without extension; the recorder adds it
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        model
            .clone()
            .save_file(path.clone(), &WeightRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the weights of the latest saved epoch into `model`.
    ///
    /// The model must have the architecture of the checkpoint
    /// or loading fails.
    pub fn load_model<B: Backend>(
        &self,
        model:  ShapeCnn<B>,
        device: &B::Device,
    ) -> Result<ShapeCnn<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        model
            .load_file(path.clone(), &WeightRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' first.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    /// Read latest_epoch.json and return the epoch number.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");

        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::Category;
    use crate::ml::model::ShapeCnnConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn manager(dir: &tempfile::TempDir) -> CheckpointManager {
        CheckpointManager::new(dir.path().to_string_lossy())
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = manager(&dir);

        let cfg = TrainConfig {
            categories: vec![Category::Star, Category::Circle],
            epochs:     3,
            seed:       Some(7),
            ..TrainConfig::default()
        };
        ckpt.save_config(&cfg).unwrap();

        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.categories, cfg.categories);
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.seed, Some(7));
        assert_eq!(loaded.plateau, cfg.plateau);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = manager(&dir);
        assert!(ckpt.latest_epoch().is_err());
        assert!(ckpt.load_config().is_err());
    }

    #[test]
    fn test_model_round_trip_keeps_predictions() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = manager(&dir);
        let device = Default::default();

        let cfg = ShapeCnnConfig::new(6);
        let model: ShapeCnn<TestBackend> = cfg.init(&device);
        ckpt.save_model(&model, 1).unwrap();
        ckpt.save_model(&model, 2).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);

        let fresh: ShapeCnn<TestBackend> = cfg.init(&device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        let input = Tensor::<TestBackend, 4>::ones([1, 1, 56, 56], &device);
        let a = model.forward(input.clone()).into_data().to_vec::<f32>().unwrap();
        let b = loaded.forward(input).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }
}
