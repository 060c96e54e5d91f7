// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Fetch bitmaps + build sample index (Layer 4 - data)
//   Step 2: Partition train/val/test            (Layer 4 - data)
//   Step 3: Build the three loaders             (Layer 4 - data)
//   Step 4: Save config                         (Layer 6 - infra)
//   Step 5: Run training loop                   (Layer 5 - ml)
//   Step 6: Evaluate on the test set            (Layer 5 - ml)
//   Step 7: Export ONNX                         (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    dataset::{ShapeDataset, Subset},
    loader::build_loader,
    source::QuickDrawSource,
    splitter::split_train_val_test,
    transform::{UpscaleTransform, TARGET_SIZE},
};
use crate::domain::{
    category::Category,
    sample::SOURCE_SIZE,
    traits::{ArtifactSink, BitmapSource},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    onnx::{OnnxExporter, DEFAULT_FILE_NAME},
};
use crate::ml::{
    evaluator::evaluate,
    model::ShapeCnnConfig,
    scheduler::PlateauConfig,
    trainer::train_loop,
    TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All parameters of a training run. Saved next to the checkpoints
// so `classify` and `export` can rebuild the same network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub categories:          Vec<Category>,
    pub samples_per_category: usize,
    pub data_dir:            String,
    pub artifact_dir:        String,
    pub onnx_file:           String,
    pub image_size:          usize,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub lr:                  f64,
    pub weight_decay:        f64,
    pub train_fraction:      f64,
    pub val_fraction:        f64,
    pub plateau:             PlateauConfig,
    /// Release device memory every N training batches
    pub cleanup_interval:    usize,
    /// Fixes the partition and shuffle order when set
    pub seed:                Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            categories:           Category::ALL.to_vec(),
            samples_per_category: 5000,
            data_dir:             "data".to_string(),
            artifact_dir:         "artifacts".to_string(),
            onnx_file:            DEFAULT_FILE_NAME.to_string(),
            image_size:           TARGET_SIZE,
            batch_size:           64,
            epochs:               15,
            lr:                   1e-3,
            weight_decay:         1e-4,
            train_fraction:       0.8,
            val_fraction:         0.1,
            plateau:              PlateauConfig::default(),
            cleanup_interval:     20,
            seed:                 None,
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub total_samples: usize,
    pub train_size:    usize,
    pub val_size:      usize,
    pub test_size:     usize,
    pub history:       Vec<EpochMetrics>,
    pub test_acc:      f64,
    pub metrics_path:  PathBuf,
    pub onnx_path:     PathBuf,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train on QuickDraw data with the GPU backend.
    pub fn execute(&self) -> Result<TrainSummary> {
        let source = QuickDrawSource::new(&self.config.data_dir);
        let device = Default::default();
        self.execute_with::<TrainBackend>(&source, &device)
    }

    /// Execute the full training pipeline end to end on any
    /// autodiff backend and bitmap source.
    pub fn execute_with<B: AutodiffBackend>(
        &self,
        source: &dyn BitmapSource,
        device: &B::Device,
    ) -> Result<TrainSummary> {
        let cfg = &self.config;
        ensure!(!cfg.categories.is_empty(), "at least one category is required");
        ensure!(cfg.batch_size > 0, "batch size must be positive");

        tracing::info!("Loading QuickDraw dataset (memory efficient)...");

        // ── Step 1: Sample index ──────────────────────────────────────────────
        let transform = UpscaleTransform::new(SOURCE_SIZE, cfg.image_size);
        let dataset   = ShapeDataset::build(source, &cfg.categories, cfg.samples_per_category, transform)?;
        let total     = dataset.samples().len();
        tracing::info!("Label order: {:?}", dataset.categories());

        // ── Step 2: Partition ─────────────────────────────────────────────────
        let partition = split_train_val_test(total, cfg.train_fraction, cfg.val_fraction, cfg.seed);
        let (train_size, val_size, test_size) =
            (partition.train.len(), partition.val.len(), partition.test.len());
        tracing::info!("Train: {}, Val: {}, Test: {}", train_size, val_size, test_size);

        // ── Step 3: Loaders ───────────────────────────────────────────────────
        // Only the training loader shuffles
        let shared       = dataset.into_shared();
        let shuffle_seed = cfg.seed.unwrap_or_else(rand::random);
        let train_loader = build_loader::<B>(
            Subset::new(shared.clone(), partition.train), cfg.batch_size, Some(shuffle_seed),
        );
        let val_loader  = build_loader::<B::InnerBackend>(
            Subset::new(shared.clone(), partition.val), cfg.batch_size, None,
        );
        let test_loader = build_loader::<B::InnerBackend>(
            Subset::new(shared, partition.test), cfg.batch_size, None,
        );

        // ── Step 4: Persist config ────────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.artifact_dir);
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.artifact_dir)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let model = ShapeCnnConfig::new(cfg.categories.len())
            .with_image_size(cfg.image_size)
            .init::<B>(device);
        let outcome = train_loop(cfg, model, train_loader, val_loader, &ckpt_manager, &metrics, device)?;

        // ── Step 6: Test ──────────────────────────────────────────────────────
        let model    = outcome.model.valid();
        let test_acc = evaluate(&model, &test_loader);
        tracing::info!("Test accuracy: {:.2}%", test_acc);

        // ── Step 7: Export ────────────────────────────────────────────────────
        let exporter  = OnnxExporter::new(cfg.image_size).with_file_name(&cfg.onnx_file);
        let onnx_path = exporter
            .export(&model, Path::new(&cfg.artifact_dir))
            .context("ONNX export failed")?;

        Ok(TrainSummary {
            total_samples: total,
            train_size,
            val_size,
            test_size,
            history: outcome.history,
            test_acc,
            metrics_path: metrics.csv_path().clone(),
            onnx_path,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::SyntheticSource;
    use crate::infra::onnx::{inspect_file, Dim};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.categories, Category::ALL.to_vec());
        assert_eq!(cfg.samples_per_category, 5000);
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.epochs, 15);
        assert_eq!(cfg.image_size, 56);
        assert_eq!(cfg.onnx_file, "shape_efficient_56x56.onnx");
    }

    #[test]
    fn test_end_to_end_on_synthetic_source() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            samples_per_category: 8,
            artifact_dir:         dir.path().to_string_lossy().into_owned(),
            batch_size:           16,
            epochs:               1,
            seed:                 Some(3),
            ..TrainConfig::default()
        };
        let source  = SyntheticSource { counts: vec![10; 6] };
        let summary = TrainUseCase::new(cfg)
            .execute_with::<TestBackend>(&source, &Default::default())
            .unwrap();

        assert_eq!(summary.total_samples, 48);
        assert_eq!((summary.train_size, summary.val_size, summary.test_size), (38, 4, 6));
        assert_eq!(summary.history.len(), 1);
        assert!(summary.history[0].train_loss.is_finite());
        assert!((0.0..=100.0).contains(&summary.history[0].val_acc));
        assert!((0.0..=100.0).contains(&summary.test_acc));

        let onnx = inspect_file(&summary.onnx_path).unwrap();
        let out  = onnx.output("output").unwrap();
        assert_eq!(out.dims, vec![Dim::Symbolic("batch_size".into()), Dim::Fixed(6)]);

        assert!(dir.path().join("train_config.json").exists());
        assert!(summary.metrics_path.exists());
    }

    #[test]
    fn test_source_failure_aborts_before_training() {
        struct Offline;
        impl BitmapSource for Offline {
            fn fetch(&self, _: Category) -> Result<crate::domain::sample::BitmapArray> {
                anyhow::bail!("connection refused")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            artifact_dir: dir.path().to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg)
            .execute_with::<TestBackend>(&Offline, &Default::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("connection refused"));
        assert!(!dir.path().join("train_config.json").exists());
    }
}
