// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, runs or optimises the network.
//
//   model.rs      — ShapeCnn: three conv stages + 3-layer
//                   classifier head, cross-entropy loss
//
//   scheduler.rs  — reduce-on-plateau learning rate control
//                   driven by validation accuracy
//
//   trainer.rs    — the epoch loop: Adam step per batch,
//                   validation, checkpoint + metrics per epoch
//
//   evaluator.rs  — inference-only accuracy over a loader
//
//   inferencer.rs — loads a checkpoint, classifies one picture
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

use burn::backend::{Autodiff, Wgpu};

/// GPU backend used for inference and evaluation
pub type InferBackend = Wgpu;

/// Same backend with gradient tracking, used for training
pub type TrainBackend = Autodiff<Wgpu>;

/// CNN shape classifier architecture
pub mod model;

/// Learning rate reduction on validation plateaus
pub mod scheduler;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Accuracy measurement without parameter updates
pub mod evaluator;

/// Inference engine: loads a checkpoint and ranks categories
pub mod inferencer;
