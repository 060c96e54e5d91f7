// ============================================================
// Layer 4 — Train/Validation/Test Splitter
// ============================================================
// Randomly permutes sample indices and cuts them into three
// disjoint sets:
//   - Training set:   used to update model weights
//   - Validation set: drives the learning-rate scheduler
//   - Test set:       measured once, after training
//
// Sizes (80/10/10 by default):
//   train = floor(0.8 * total)
//   val   = floor(0.1 * total)
//   test  = total - train - val      (absorbs the rounding)
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom. Without a
// seed the split is different on every run.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Index lists for the three subsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub val:   Vec<usize>,
    pub test:  Vec<usize>,
}

/// Compute (train, val, test) sizes by truncation.
pub fn split_sizes(total: usize, train_fraction: f64, val_fraction: f64) -> (usize, usize, usize) {
    let train = ((total as f64) * train_fraction) as usize;
    let val   = ((total as f64) * val_fraction) as usize;

    // Clamp to valid range to avoid panics on odd fractions
    let train = train.min(total);
    let val   = val.min(total - train);

    (train, val, total - train - val)
}

/// Randomly partition `0..total` into train/val/test index lists.
///
/// # Arguments
/// * `total`          - Number of labeled samples
/// * `train_fraction` - e.g. 0.8
/// * `val_fraction`   - e.g. 0.1
/// * `seed`           - `Some` for a reproducible split
pub fn split_train_val_test(
    total:          usize,
    train_fraction: f64,
    val_fraction:   f64,
    seed:           Option<u64>,
) -> Partition {
    let mut indices: Vec<usize> = (0..total).collect();

    match seed {
        Some(seed) => indices.shuffle(&mut StdRng::seed_from_u64(seed)),
        None       => indices.shuffle(&mut rand::thread_rng()),
    }

    let (train_len, val_len, _) = split_sizes(total, train_fraction, val_fraction);

    // split_off(n) removes elements [n..] and returns them
    let mut train = indices;
    let mut val   = train.split_off(train_len);
    let test      = val.split_off(val_len);

    tracing::debug!(
        "Dataset split: {} training, {} validation, {} test",
        train.len(), val.len(), test.len(),
    );

    Partition { train, val, test }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_correct_split_sizes() {
        let p = split_train_val_test(100, 0.8, 0.1, None);
        assert_eq!(p.train.len(), 80);
        assert_eq!(p.val.len(),   10);
        assert_eq!(p.test.len(),  10);
    }

    #[test]
    fn test_full_scale_split() {
        // 6 categories x 5000 samples
        let p = split_train_val_test(30_000, 0.8, 0.1, None);
        assert_eq!((p.train.len(), p.val.len(), p.test.len()), (24_000, 3_000, 3_000));
    }

    #[test]
    fn test_remainder_goes_to_test() {
        // 0.8 * 17 = 13.6 → 13, 0.1 * 17 = 1.7 → 1, test = 3
        assert_eq!(split_sizes(17, 0.8, 0.1), (13, 1, 3));
    }

    #[test]
    fn test_partition_is_disjoint_cover() {
        let p = split_train_val_test(257, 0.8, 0.1, Some(3));
        let all: Vec<usize> = p.train.iter().chain(&p.val).chain(&p.test).copied().collect();
        let unique: HashSet<usize> = all.iter().copied().collect();

        assert_eq!(all.len(), 257);
        assert_eq!(unique.len(), 257);
        assert!(unique.iter().all(|&i| i < 257));
    }

    #[test]
    fn test_seed_makes_split_reproducible() {
        let a = split_train_val_test(500, 0.8, 0.1, Some(42));
        let b = split_train_val_test(500, 0.8, 0.1, Some(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let p = split_train_val_test(0, 0.8, 0.1, None);
        assert!(p.train.is_empty() && p.val.is_empty() && p.test.is_empty());
    }
}
