// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles a MoleculeDataset and splits it into two datasets:
//   - Training set:   used to fit the scaler and the model
//   - Validation set: normalised with the training scaler
//
// Input files are often ordered (by scaffold, by assay, by
// date), so the shuffle happens before the cut.
//
// The shuffle goes through MoleculeDataset::shuffle, so a seed
// makes the split reproducible and self-supervised datapoints
// get fresh masks on the way through.
//
// Split ratio: 80% training, 20% validation (configurable)

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::MoleculeDataset;
use crate::domain::error::{DataError, DataResult};

/// Shuffle `dataset` and split into (train, validation).
///
/// # Arguments
/// * `dataset`        - All available molecules (consumed by this function)
/// * `train_fraction` - Proportion for training, e.g. 0.8 = 80%
/// * `seed`           - Fixes the permutation and the RNGs of both halves
pub fn split_train_val(
    mut dataset:    MoleculeDataset,
    train_fraction: f64,
    seed:           Option<u64>,
) -> DataResult<(MoleculeDataset, MoleculeDataset)> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(DataError::InvalidArgument(format!(
            "train fraction must be within [0, 1], got {train_fraction}"
        )));
    }

    dataset.shuffle(seed)?;

    let total    = dataset.len();
    let split_at = (((total as f64) * train_fraction).round() as usize).min(total);

    let mut train = dataset.into_datapoints();
    let val       = train.split_off(split_at);

    let mut seeds = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None    => StdRng::from_entropy(),
    };

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        train.len(),
        val.len(),
        (train.len() * 100) / total.max(1),
        (val.len()   * 100) / total.max(1),
    );

    Ok((
        MoleculeDataset::with_seed(train, seeds.gen()),
        MoleculeDataset::with_seed(val,   seeds.gen()),
    ))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datapoint::MoleculeDatapoint;
    use crate::domain::config::DataConfig;

    fn dataset(n: usize) -> MoleculeDataset {
        let data = (0..n)
            .map(|i| {
                let rec = vec![format!("C{}", "C".repeat(i % 7)), i.to_string()];
                MoleculeDatapoint::new(&rec, &DataConfig::default(), None, false).unwrap()
            })
            .collect();
        MoleculeDataset::new(data)
    }

    fn labels(ds: &MoleculeDataset) -> Vec<f64> {
        ds.iter().map(|d| d.targets.get(0).unwrap().unwrap()).collect()
    }

    #[test]
    fn test_correct_split_sizes() {
        let (train, val) = split_train_val(dataset(100), 0.8, Some(1)).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(),   20);
    }

    #[test]
    fn test_all_molecules_preserved() {
        let (train, val) = split_train_val(dataset(50), 0.7, None).unwrap();
        let mut all = labels(&train);
        all.extend(labels(&val));
        all.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(all, (0..50).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_split_is_reproducible() {
        let (a, _) = split_train_val(dataset(40), 0.5, Some(17)).unwrap();
        let (b, _) = split_train_val(dataset(40), 0.5, Some(17)).unwrap();
        assert_eq!(labels(&a), labels(&b));
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_train_val(MoleculeDataset::new(Vec::new()), 0.8, None).unwrap();
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let (train, val) = split_train_val(dataset(10), 1.0, None).unwrap();
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }

    #[test]
    fn test_fraction_out_of_range() {
        assert!(matches!(
            split_train_val(dataset(3), 1.5, None),
            Err(DataError::InvalidArgument(_))
        ));
    }
}
