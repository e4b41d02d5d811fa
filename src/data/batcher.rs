// ============================================================
// Layer 4 — Molecule Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec of
// MoleculeDatapoints into tensors a training step can consume.
//
// Per-molecule values are stacked into [batch, width] tensors:
//   features      [N, features_size]   (only if the data has features)
//   targets       [N, num_tasks]       missing labels filled with 0
//   target_mask   [N, num_tasks]       1 = label present, 0 = missing
//
// Multiplying the per-task loss by target_mask ignores missing
// labels without special-casing them in the model.
//
// Self-supervised batches additionally carry per-atom tensors.
// Molecules have different atom counts, so these are flattened
// in batch order rather than padded:
//   vocab_targets [total_atoms]        vocabulary index per atom
//   atom_mask     [total_atoms]        1 = visible, 0 = masked
//   atom_counts   [N]                  atoms per molecule, to unflatten
//
// All datapoints in a batch are assumed homogeneous (same
// feature width and task count), as in MoleculeDataset.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::datapoint::MoleculeDatapoint;

// ─── MoleculeBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct MoleculeBatch<B: Backend> {
    /// Shape: [batch_size, features_size]
    pub features: Option<Tensor<B, 2>>,

    /// Shape: [batch_size, num_tasks]
    pub targets: Tensor<B, 2>,

    /// Shape: [batch_size, num_tasks]
    pub target_mask: Tensor<B, 2>,

    pub atoms: Option<AtomBatch<B>>,
}

/// Flattened per-atom tensors of a self-supervised batch.
#[derive(Debug, Clone)]
pub struct AtomBatch<B: Backend> {
    /// Shape: [total_atoms]
    pub vocab_targets: Tensor<B, 1, Int>,

    /// Shape: [total_atoms]
    pub atom_mask: Tensor<B, 1, Int>,

    /// Shape: [batch_size]
    pub atom_counts: Tensor<B, 1, Int>,
}

// ─── MoleculeBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct MoleculeBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> MoleculeBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack_floats(&self, flat: Vec<f32>, rows: usize, cols: usize) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device).reshape([rows, cols])
    }

    fn ints(&self, flat: Vec<i32>) -> Tensor<B, 1, Int> {
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
    }

    fn atom_batch(&self, items: &[MoleculeDatapoint]) -> AtomBatch<B> {
        let mut vocab  = Vec::new();
        let mut mask   = Vec::new();
        let mut counts = Vec::with_capacity(items.len());

        // Datapoints without bert_init contribute no atoms.
        for d in items {
            let v = d.vocab_targets().unwrap_or(&[]);
            let m = d.mask().unwrap_or(&[]);
            vocab.extend(v.iter().map(|&x| x as i32));
            mask.extend(m.iter().map(|&x| x as i32));
            counts.push(v.len() as i32);
        }

        AtomBatch {
            vocab_targets: self.ints(vocab),
            atom_mask:     self.ints(mask),
            atom_counts:   self.ints(counts),
        }
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<MoleculeDatapoint, MoleculeBatch<B>> for MoleculeBatcher<B> {
    fn batch(&self, items: Vec<MoleculeDatapoint>) -> MoleculeBatch<B> {
        let batch_size = items.len();
        let num_tasks  = items.first().map(|d| d.targets.len()).unwrap_or(0);

        // ── Features ──────────────────────────────────────────────────────────
        let features_size = items.first().and_then(|d| d.features.as_ref()).map(Vec::len);
        let features = features_size.map(|width| {
            let flat: Vec<f32> = items
                .iter()
                .flat_map(|d| match d.features.as_deref() {
                    Some(f) => f.iter().map(|&x| x as f32).collect::<Vec<_>>(),
                    None    => vec![0.0; width],
                })
                .collect();
            self.stack_floats(flat, batch_size, width)
        });

        // ── Targets and their presence mask ──────────────────────────────────
        let mut targets     = Vec::with_capacity(batch_size * num_tasks);
        let mut target_mask = Vec::with_capacity(batch_size * num_tasks);
        for d in &items {
            for value in d.targets.to_dense() {
                targets.push(value.unwrap_or(0.0) as f32);
                target_mask.push(if value.is_some() { 1.0 } else { 0.0 });
            }
        }

        let atoms = items
            .first()
            .filter(|d| d.is_self_supervised())
            .map(|_| self.atom_batch(&items));

        MoleculeBatch {
            features,
            targets:     self.stack_floats(targets, batch_size, num_tasks),
            target_mask: self.stack_floats(target_mask, batch_size, num_tasks),
            atoms,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    use crate::data::datapoint::tests::bert_config;
    use crate::domain::config::{DataConfig, MaskPolicy};

    type TestBackend = NdArray;

    fn floats<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    fn ints(t: Tensor<TestBackend, 1, Int>) -> Vec<i64> {
        t.into_data().convert::<i64>().to_vec::<i64>().unwrap()
    }

    fn batcher() -> MoleculeBatcher<TestBackend> {
        MoleculeBatcher::new(Default::default())
    }

    #[test]
    fn test_supervised_batch_shapes_and_missing_labels() {
        let cfg = DataConfig::default();
        let items = vec![
            MoleculeDatapoint::new(&["CCO", "1.5", ""], &cfg, Some(vec![1.0, 2.0, 3.0]), false).unwrap(),
            MoleculeDatapoint::new(&["CCN", "", "-2"], &cfg, Some(vec![4.0, 5.0, 6.0]), false).unwrap(),
        ];
        let batch = batcher().batch(items);

        let features = batch.features.unwrap();
        assert_eq!(features.dims(), [2, 3]);
        assert_eq!(floats(features), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(batch.targets.dims(), [2, 2]);
        assert_eq!(floats(batch.targets), vec![1.5, 0.0, 0.0, -2.0]);
        assert_eq!(floats(batch.target_mask), vec![1.0, 0.0, 0.0, 1.0]);
        assert!(batch.atoms.is_none());
    }

    #[test]
    fn test_batch_without_features() {
        let cfg = DataConfig::default();
        let items = vec![MoleculeDatapoint::new(&["C", "1"], &cfg, None, false).unwrap()];
        let batch = batcher().batch(items);
        assert!(batch.features.is_none());
        assert_eq!(batch.targets.dims(), [1, 1]);
    }

    #[test]
    fn test_self_supervised_batch_flattens_atoms() {
        let cfg = bert_config(MaskPolicy::Random);
        let mut rng = StdRng::seed_from_u64(4);
        let items: Vec<MoleculeDatapoint> = ["CCO", "CCCCN"]
            .iter()
            .map(|s| {
                let mut d = MoleculeDatapoint::new(&[*s], &cfg, None, false).unwrap();
                d.bert_init(&cfg, &mut rng).unwrap();
                d
            })
            .collect();
        let expected_mask: Vec<i64> = items
            .iter()
            .flat_map(|d| d.mask().unwrap().iter().map(|&m| m as i64))
            .collect();

        let atoms = batcher().batch(items).atoms.unwrap();
        assert_eq!(atoms.vocab_targets.dims(), [8]);
        assert_eq!(ints(atoms.atom_counts), vec![3, 5]);
        assert_eq!(ints(atoms.atom_mask), expected_mask);
    }
}
