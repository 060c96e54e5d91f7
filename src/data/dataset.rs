use anyhow::{ensure, Context, Result};
use burn::data::dataset::Dataset;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::data::transform::UpscaleTransform;
use crate::domain::category::Category;
use crate::domain::sample::{BitmapArray, LabeledSample, SampleKey};
use crate::domain::traits::BitmapSource;

/// One transformed sample: a 1-channel upscaled image and its label.
#[derive(Debug, Clone)]
pub struct ShapeItem {
    /// Row-major pixels in [0,1], `side * side` values
    pub pixels: Vec<f32>,
    pub side:   usize,
    pub label:  usize,
}

/// Sample index over resident per-category bitmap arrays.
///
/// Only the raw 28x28 bitmaps are kept in memory; every `get`
/// re-runs the upscale transform on the one bitmap it needs.
pub struct ShapeDataset {
    categories: Vec<Category>,
    bitmaps:    BTreeMap<Category, BitmapArray>,
    samples:    Vec<LabeledSample>,
    transform:  UpscaleTransform,
}

impl ShapeDataset {
    /// Build the index: fetch every category, keep at most `cap`
    /// bitmaps of each, label them by their position in `categories`.
    pub fn build(
        source:     &dyn BitmapSource,
        categories: &[Category],
        cap:        usize,
        transform:  UpscaleTransform,
    ) -> Result<Self> {
        for (i, category) in categories.iter().enumerate() {
            ensure!(
                !categories[..i].contains(category),
                "category '{category}' is listed more than once"
            );
        }

        let mut bitmaps = BTreeMap::new();
        let mut samples = Vec::new();

        for (label, &category) in categories.iter().enumerate() {
            tracing::info!("Loading {}...", category);
            let mut images = source
                .fetch(category)
                .with_context(|| format!("Cannot retrieve bitmaps for '{category}'"))?;
            images.truncate(cap);
            if images.is_empty() {
                tracing::warn!("No bitmaps retained for {}", category);
            }

            samples.extend((0..images.len()).map(|i| LabeledSample::new(category, i, label)));
            tracing::info!("  Loaded {} samples for {}", images.len(), category);

            bitmaps.insert(category, images);
        }

        tracing::info!("Total dataset size: {} samples", samples.len());
        Ok(Self { categories: categories.to_vec(), bitmaps, samples, transform })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    /// Number of samples contributed by `category`.
    pub fn count_for(&self, category: Category) -> usize {
        self.bitmaps.get(&category).map_or(0, BitmapArray::len)
    }

    /// Load and transform the bitmap behind `key`.
    pub fn transform_key(&self, key: SampleKey) -> Option<Vec<f32>> {
        let bitmap = self.bitmaps.get(&key.category)?.get(key.index)?;
        Some(self.transform.apply(bitmap))
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Dataset<ShapeItem> for ShapeDataset {
    fn get(&self, index: usize) -> Option<ShapeItem> {
        let sample = self.samples.get(index)?;
        let pixels = self.transform_key(sample.key)?;
        Some(ShapeItem { pixels, side: self.transform.target_size(), label: sample.label })
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// An ordered view of some of a dataset's indices.
///
/// Several subsets share one `Arc<ShapeDataset>`, so splitting
/// never copies bitmaps.
#[derive(Clone)]
pub struct Subset {
    dataset: Arc<ShapeDataset>,
    indices: Vec<usize>,
}

impl Subset {
    pub fn new(dataset: Arc<ShapeDataset>, indices: Vec<usize>) -> Self {
        Self { dataset, indices }
    }
}

impl Dataset<ShapeItem> for Subset {
    fn get(&self, index: usize) -> Option<ShapeItem> {
        self.dataset.get(*self.indices.get(index)?)
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::transform::TARGET_SIZE;
    use crate::domain::sample::{SOURCE_PIXELS, SOURCE_SIZE};

    /// In-memory source: `counts[i]` bitmaps for `Category::ALL[i]`,
    /// each bitmap filled with a category-specific pattern.
    pub(crate) struct SyntheticSource {
        pub counts: Vec<usize>,
    }

    impl BitmapSource for SyntheticSource {
        fn fetch(&self, category: Category) -> Result<BitmapArray> {
            let pos   = Category::ALL.iter().position(|&c| c == category).unwrap();
            let count = self.counts.get(pos).copied().unwrap_or(0);
            let mut pixels = vec![0u8; SOURCE_PIXELS * count];
            for img in 0..count {
                // Draw one horizontal stroke whose row depends on the category
                let row = 4 + pos * 3;
                for x in 4..24 {
                    pixels[img * SOURCE_PIXELS + row * SOURCE_SIZE + x] = 255;
                }
            }
            BitmapArray::new(pixels, SOURCE_SIZE)
        }
    }

    struct FailingSource;

    impl BitmapSource for FailingSource {
        fn fetch(&self, category: Category) -> Result<BitmapArray> {
            anyhow::bail!("network down while fetching {category}")
        }
    }

    pub(crate) fn small_dataset(per_category: usize) -> ShapeDataset {
        let src = SyntheticSource { counts: vec![per_category; 6] };
        ShapeDataset::build(&src, &Category::ALL, per_category, UpscaleTransform::default()).unwrap()
    }

    #[test]
    fn test_count_is_min_of_retrieved_and_cap() {
        let src = SyntheticSource { counts: vec![10, 3, 7, 0, 12, 5] };
        let ds  = ShapeDataset::build(&src, &Category::ALL, 6, UpscaleTransform::default()).unwrap();

        let expected = [6, 3, 6, 0, 6, 5];
        for (cat, want) in Category::ALL.iter().zip(expected) {
            assert_eq!(ds.count_for(*cat), want, "{cat}");
            let labeled = ds.samples().iter().filter(|s| s.key.category == *cat).count();
            assert_eq!(labeled, want, "{cat}");
        }
        assert_eq!(ds.len(), 26);
    }

    #[test]
    fn test_labels_follow_enumeration_position() {
        let ds = small_dataset(2);
        for s in ds.samples() {
            let pos = Category::ALL.iter().position(|&c| c == s.key.category).unwrap();
            assert_eq!(s.label, pos);
        }
    }

    #[test]
    fn test_custom_enumeration_relabels() {
        let src = SyntheticSource { counts: vec![2; 6] };
        let cats = [Category::Star, Category::Circle];
        let ds   = ShapeDataset::build(&src, &cats, 2, UpscaleTransform::default()).unwrap();

        assert_eq!(ds.len(), 4);
        assert!(ds.samples().iter().filter(|s| s.key.category == Category::Star).all(|s| s.label == 0));
        assert!(ds.samples().iter().filter(|s| s.key.category == Category::Circle).all(|s| s.label == 1));
    }

    #[test]
    fn test_duplicate_category_is_rejected() {
        let src  = SyntheticSource { counts: vec![3; 6] };
        let cats = [Category::Circle, Category::Circle];
        let Err(err) = ShapeDataset::build(&src, &cats, 3, UpscaleTransform::default()) else {
            panic!("duplicate categories accepted");
        };
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_get_transforms_every_category_to_target_shape() {
        let ds = small_dataset(1);
        for i in 0..ds.len() {
            let item = ds.get(i).unwrap();
            assert_eq!(item.side, TARGET_SIZE);
            assert_eq!(item.pixels.len(), TARGET_SIZE * TARGET_SIZE);
        }
        assert!(ds.get(ds.len()).is_none());
    }

    #[test]
    fn test_retrieval_failure_propagates() {
        let result = ShapeDataset::build(&FailingSource, &Category::ALL, 5, UpscaleTransform::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_subset_maps_through_indices() {
        let ds     = small_dataset(2).into_shared();
        let subset = Subset::new(ds.clone(), vec![11, 0]);

        assert_eq!(subset.len(), 2);
        assert_eq!(subset.get(0).unwrap().label, ds.get(11).unwrap().label);
        assert_eq!(subset.get(1).unwrap().label, 0);
        assert!(subset.get(2).is_none());
    }
}
