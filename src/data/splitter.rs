// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Holds out the TRAILING fraction of the samples for validation,
// before any shuffling:
//
//   split_at = floor(n × (1 − fraction))
//   train    = samples[..split_at]
//   val      = samples[split_at..]
//
// Records arrive in sorted order, so the split is reproducible
// from run to run. The training DataLoader shuffles the training
// half afterwards.
//
// When the split would leave either side empty (tiny datasets,
// fraction 0.0) validation is skipped and everything trains.

/// Split `samples` into (train, validation).
pub fn split_train_val<T>(mut samples: Vec<T>, validation_fraction: f64) -> (Vec<T>, Vec<T>) {
    let total    = samples.len();
    let split_at = ((total as f64) * (1.0 - validation_fraction)).floor() as usize;

    if validation_fraction <= 0.0 || split_at == 0 || split_at >= total {
        if validation_fraction > 0.0 {
            tracing::warn!(
                "{} samples cannot be split with validation fraction {}; training without validation",
                total,
                validation_fraction
            );
        }
        return (samples, Vec::new());
    }

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.2);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(),   20);
    }

    #[test]
    fn test_validation_is_the_tail() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val)      = split_train_val(items, 0.2);
        assert_eq!(train, (0..8).collect::<Vec<_>>());
        assert_eq!(val,   vec![8, 9]);
    }

    #[test]
    fn test_split_point_rounds_down() {
        // floor(7 × 0.8) = 5
        let (train, val) = split_train_val((0..7).collect::<Vec<usize>>(), 0.2);
        assert_eq!(train.len(), 5);
        assert_eq!(val.len(),   2);
    }

    #[test]
    fn test_tiny_dataset_skips_validation() {
        let (train, val) = split_train_val(vec![1usize], 0.2);
        assert_eq!(train, vec![1]);
        assert!(val.is_empty());
    }

    #[test]
    fn test_zero_fraction_keeps_everything() {
        let (train, val) = split_train_val((0..10).collect::<Vec<usize>>(), 0.0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_train_val(Vec::<usize>::new(), 0.2);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}
