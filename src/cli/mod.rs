// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — fetch data, train, test, export ONNX
//   2. `classify` — rank the categories for one picture
//   3. `export`   — rewrite the ONNX file from the last checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ClassifyArgs, Commands, ExportArgs, TrainArgs};

use crate::ml::InferBackend;

#[derive(Parser, Debug)]
#[command(
    name = "shape-classifier",
    version,
    about = "Train a CNN on QuickDraw shapes and export it as ONNX."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. This layer only routes
    /// and prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Classify(args) => run_classify(args),
            Commands::Export(args)   => run_export(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on categories: {:?}", args.categories);

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!("\nTest Accuracy: {:.2}%", summary.test_acc);
    println!("Metrics written to {}", summary.metrics_path.display());
    println!("Model exported to {}", summary.onnx_path.display());
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    use crate::application::classify_use_case::ClassifyUseCase;

    let use_case = ClassifyUseCase::<InferBackend>::new(&args.artifact_dir, Default::default())?;
    let pred     = use_case.classify_file(std::path::Path::new(&args.image))?;

    if let Some((category, confidence)) = pred.best() {
        println!("\nPrediction: {} ({:.1}%)", category, confidence * 100.0);
    }
    for (category, p) in &pred.ranking {
        println!("  {:<10} {:>6.2}%", category.name(), p * 100.0);
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    use crate::application::export_use_case::ExportUseCase;

    let path = ExportUseCase::new(args.artifact_dir, args.output_dir)
        .execute::<InferBackend>(&Default::default())?;

    println!("Model exported to {}", path.display());
    Ok(())
}
