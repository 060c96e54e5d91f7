// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop with Burn's DataLoader, Adam and a plateau scheduler.
//
// Per epoch:
//   1. forward → cross-entropy → backward → Adam step, per batch
//   2. running loss sum, correct count, sample count
//   3. validation accuracy on model.valid()
//   4. scheduler.step(val_acc) → learning rate for next epoch
//   5. checkpoint + metrics row
//
// Every `cleanup_interval` batches (batch index divisible by it)
// and at the end of each epoch the device queue is flushed so the
// dropped batch tensors are actually freed.
//
// Key Burn insight:
//   - Training uses B (Autodiff<...>) for gradients
//   - model.valid() returns model on B::InnerBackend
//   - Validation loader must also use B::InnerBackend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::loader::ShapeLoader;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::evaluator::{accuracy_percent, evaluate};
use crate::ml::model::{count_correct, ShapeCnn};
use crate::ml::scheduler::ReduceOnPlateau;

/// The trained model and one metrics row per epoch.
pub struct TrainOutcome<B: AutodiffBackend> {
    pub model:   ShapeCnn<B>,
    pub history: Vec<EpochMetrics>,
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    mut model:    ShapeCnn<B>,
    train_loader: ShapeLoader<B>,
    val_loader:   ShapeLoader<B::InnerBackend>,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
    device:       &B::Device,
) -> Result<TrainOutcome<B>> {
    // ── Adam optimiser with L2 weight decay ───────────────────────────────────
    let optim_cfg = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay as f32)));
    let mut optim = optim_cfg.init();

    let mut scheduler = ReduceOnPlateau::new(cfg.lr, cfg.plateau);
    let mut history   = Vec::with_capacity(cfg.epochs);
    let cleanup_every = cfg.cleanup_interval.max(1);

    tracing::info!("Starting memory-efficient training...");

    for epoch in 1..=cfg.epochs {
        let lr = scheduler.lr();

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;
        let mut total    = 0usize;

        for (batch_idx, batch) in train_loader.iter().enumerate() {
            total += batch.targets.dims()[0];

            let (loss, scores) = model.forward_loss(batch.images, batch.targets.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;
            correct  += count_correct(scores, batch.targets);

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);

            if batch_idx % cleanup_every == 0 {
                release_transient_memory::<B>(device);
            }
        }

        let avg_loss  = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let train_acc = accuracy_percent(correct, total);

        // ── Validation phase ──────────────────────────────────────────────────
        // dropout disabled, BatchNorm frozen
        let val_acc = evaluate(&model.valid(), &val_loader);

        scheduler.step(val_acc);

        println!(
            "Epoch {:>2}/{}: Loss: {:.4}, Train Acc: {:.2}%, Val Acc: {:.2}%",
            epoch, cfg.epochs, avg_loss, train_acc, val_acc,
        );

        let row = EpochMetrics::new(epoch, avg_loss, train_acc, val_acc, lr);
        metrics.log(&row)?;
        history.push(row);

        ckpt_manager.save_model(&model, epoch)?;
        tracing::debug!("Checkpoint saved for epoch {}", epoch);

        release_transient_memory::<B>(device);
    }

    tracing::info!("Training complete!");
    Ok(TrainOutcome { model, history })
}

/// Flush queued device work so freed tensors return to the pool.
/// Best effort: a failed sync only loses the reclaim.
fn release_transient_memory<B: Backend>(device: &B::Device) {
    let _ = B::sync(device);
    tracing::trace!("Released transient device memory");
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{tests::small_dataset, Subset};
    use crate::data::loader::build_loader;
    use crate::ml::model::ShapeCnnConfig;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_one_epoch_produces_finite_metrics() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();

        let ds     = small_dataset(3).into_shared();
        let train  = build_loader::<TestBackend>(Subset::new(ds.clone(), (0..12).collect()), 4, Some(1));
        let val    = build_loader::<NdArray>(Subset::new(ds, (12..18).collect()), 4, None);

        let cfg = TrainConfig { epochs: 1, cleanup_interval: 2, ..TrainConfig::default() };
        let model: ShapeCnn<TestBackend> = ShapeCnnConfig::new(6).init(&device);

        let ckpt    = CheckpointManager::new(dir.path().to_string_lossy());
        let metrics = MetricsLogger::new(dir.path().to_string_lossy()).unwrap();

        let outcome = train_loop(&cfg, model, train, val, &ckpt, &metrics, &device).unwrap();

        assert_eq!(outcome.history.len(), 1);
        let row = &outcome.history[0];
        assert!(row.train_loss.is_finite());
        assert!((0.0..=100.0).contains(&row.train_acc));
        assert!((0.0..=100.0).contains(&row.val_acc));
        assert_eq!(row.lr, cfg.lr);
        assert!(dir.path().join("model_epoch_1.mpk").exists());
    }
}
