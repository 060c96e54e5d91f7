use burn::prelude::*;

use crate::data::loader::ShapeLoader;
use crate::ml::model::{count_correct, ShapeCnn};

/// Percentage of correctly classified samples; 0 for an empty set.
pub fn accuracy_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * correct as f64 / total as f64
    }
}

/// Inference-only accuracy of `model` over every batch of `loader`.
///
/// Pass an inference-mode model (`model.valid()`): on a backend
/// without autodiff, dropout is disabled and BatchNorm uses its
/// running statistics. Parameters are never touched.
pub fn evaluate<B: Backend>(model: &ShapeCnn<B>, loader: &ShapeLoader<B>) -> f64 {
    let mut correct = 0usize;
    let mut total   = 0usize;

    for batch in loader.iter() {
        total += batch.targets.dims()[0];
        let scores = model.forward(batch.images);
        correct += count_correct(scores, batch.targets);
    }

    accuracy_percent(correct, total)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{tests::small_dataset, Subset};
    use crate::data::loader::build_loader;
    use crate::ml::model::ShapeCnnConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_accuracy_percent() {
        assert_eq!(accuracy_percent(0, 0), 0.0);
        assert_eq!(accuracy_percent(3, 4), 75.0);
        assert_eq!(accuracy_percent(5, 5), 100.0);
    }

    #[test]
    fn test_evaluate_matches_exact_match_percentage() {
        let device = Default::default();
        let model: ShapeCnn<TestBackend> = ShapeCnnConfig::new(6).init(&device);

        let ds     = small_dataset(2).into_shared();
        let subset = Subset::new(ds, (0..12).collect());
        let loader = build_loader::<TestBackend>(subset, 5, None);

        let acc = evaluate(&model, &loader);
        assert!((0.0..=100.0).contains(&acc));

        // Recount by hand
        let mut correct = 0;
        for batch in loader.iter() {
            let predicted = model
                .forward(batch.images)
                .argmax(1)
                .into_data()
                .to_vec::<i64>()
                .unwrap();
            let labels = batch.targets.into_data().to_vec::<i64>().unwrap();
            correct += predicted.iter().zip(&labels).filter(|(p, l)| p == l).count();
        }
        assert!((acc - accuracy_percent(correct, 12)).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_empty_subset_is_zero() {
        let device = Default::default();
        let model: ShapeCnn<TestBackend> = ShapeCnnConfig::new(6).init(&device);

        let ds     = small_dataset(1).into_shared();
        let loader = build_loader::<TestBackend>(Subset::new(ds, Vec::new()), 4, None);
        assert_eq!(evaluate(&model, &loader), 0.0);
    }
}
