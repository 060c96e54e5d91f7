// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `classify`, `export`
// and all their configurable flags. Defaults reproduce the
// reference training run.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::domain::category::Category;
use crate::ml::scheduler::PlateauConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download QuickDraw data, train the CNN, test it and export ONNX
    Train(TrainArgs),

    /// Classify a picture with the latest checkpoint
    Classify(ClassifyArgs),

    /// Re-export the latest checkpoint as ONNX
    Export(ExportArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Categories to learn, in label order (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "circle,square,triangle,hexagon,octagon,star")]
    pub categories: Vec<Category>,

    /// Maximum bitmaps kept per category
    #[arg(long, default_value_t = 5000)]
    pub samples_per_category: usize,

    /// Cache directory for the downloaded .npy archives
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Where checkpoints, metrics and the ONNX file are written
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 15)]
    pub epochs: usize,

    /// Initial Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f64,

    /// Epochs without validation gain tolerated before the LR is halved
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    /// Release device memory every N batches
    #[arg(long, default_value_t = 20)]
    pub cleanup_interval: usize,

    /// Seed for a reproducible split and shuffle order
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            categories:           a.categories,
            samples_per_category: a.samples_per_category,
            data_dir:             a.data_dir,
            artifact_dir:         a.artifact_dir,
            batch_size:           a.batch_size,
            epochs:               a.epochs,
            lr:                   a.lr,
            weight_decay:         a.weight_decay,
            plateau:              PlateauConfig { patience: a.patience, ..PlateauConfig::default() },
            cleanup_interval:     a.cleanup_interval,
            seed:                 a.seed,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `classify` command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Picture to classify (PNG or JPEG, any size)
    #[arg(long)]
    pub image: String,

    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,
}

/// All arguments for the `export` command
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Directory for the ONNX file (defaults to the artifact dir)
    #[arg(long)]
    pub output_dir: Option<String>,
}
