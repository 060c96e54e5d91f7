// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{ensure, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::domain::category::Category;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{ShapeCnn, ShapeCnnConfig};

/// Softmax confidences, highest first.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub ranking: Vec<(Category, f32)>,
}

impl Prediction {
    pub fn best(&self) -> Option<(Category, f32)> {
        self.ranking.first().copied()
    }
}

pub struct Inferencer<B: Backend> {
    model:      ShapeCnn<B>,
    categories: Vec<Category>,
    image_size: usize,
    device:     B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: ShapeCnn<B>, categories: Vec<Category>, image_size: usize, device: B::Device) -> Self {
        Self { model, categories, image_size, device }
    }

    /// Rebuild the network from train_config.json and load the
    /// latest epoch's weights into it.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;
        let model: ShapeCnn<B> = ShapeCnnConfig::new(cfg.categories.len())
            .with_image_size(cfg.image_size)
            .init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, cfg.categories, cfg.image_size, device))
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Classify one `image_size`² grid of intensities in [0, 1],
    /// 1 being ink.
    pub fn classify(&self, pixels: &[f32]) -> Result<Prediction> {
        let side = self.image_size;
        ensure!(
            pixels.len() == side * side,
            "expected {}x{} = {} pixels, got {}",
            side, side, side * side, pixels.len()
        );

        let input = Tensor::<B, 1>::from_floats(pixels, &self.device)
            .reshape([1, 1, side, side]);

        let scores = self.model.forward(input);
        let probs  = softmax(scores, 1)
            .flatten::<1>(0, 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Read probabilities: {e:?}"))?;

        let mut ranking: Vec<(Category, f32)> = self
            .categories
            .iter()
            .copied()
            .zip(probs)
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

        if let Some((top, conf)) = ranking.first() {
            tracing::debug!("Predicted {} ({:.4})", top, conf);
        }
        Ok(Prediction { ranking })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn inferencer() -> Inferencer<TestBackend> {
        let device = Default::default();
        let model  = ShapeCnnConfig::new(6).init(&device);
        Inferencer::new(model, Category::ALL.to_vec(), 56, device)
    }

    #[test]
    fn test_ranking_is_a_sorted_distribution() {
        let pred = inferencer().classify(&vec![0.5; 56 * 56]).unwrap();

        assert_eq!(pred.ranking.len(), 6);
        let sum: f32 = pred.ranking.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(pred.ranking.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(pred.best(), pred.ranking.first().copied());
    }

    #[test]
    fn test_wrong_pixel_count_is_rejected() {
        assert!(inferencer().classify(&vec![0.0; 28 * 28]).is_err());
    }

    #[test]
    fn test_from_checkpoint_restores_categories() {
        use crate::application::train_use_case::TrainConfig;

        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path().to_string_lossy());
        let device = Default::default();

        let cfg = TrainConfig {
            categories: vec![Category::Circle, Category::Square],
            ..TrainConfig::default()
        };
        let model: ShapeCnn<TestBackend> = ShapeCnnConfig::new(2).init(&device);
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_model(&model, 1).unwrap();

        let inf  = Inferencer::<TestBackend>::from_checkpoint(&ckpt, device).unwrap();
        let pred = inf.classify(&vec![0.0; 56 * 56]).unwrap();
        let mut names: Vec<Category> = pred.ranking.iter().map(|(c, _)| *c).collect();
        names.sort();
        assert_eq!(names, vec![Category::Circle, Category::Square]);
    }
}
