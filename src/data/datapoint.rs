// ============================================================
// Layer 4 — Molecule Datapoint
// ============================================================
// One molecule: identity, optional auxiliary features and its
// targets, built from one raw record plus the shared DataConfig.
//
// Record layout:
//   [compound_name?, smiles, label_1, label_2, ...]
//   labels are floats or empty strings (missing)
//
// Lifecycle in self-supervised mode is two-phase:
//
//   MoleculeDatapoint::new   features + placeholder target
//          │
//          ▼
//   bert_init                atom vocab targets + adjacency,
//          │                 needs the corpus-wide vocabulary
//          ▼
//   recreate_mask            fresh atom mask; called again on
//                            every shuffle
//
// The mask generator settings are captured at construction so a
// datapoint can regenerate its mask without the config.

use rand::Rng;

use crate::data::{features, mask::MaskGenerator};
use crate::domain::{
    config::DataConfig,
    error::{DataError, DataResult},
    labels::{SparseLabelVector, Targets},
};

/// Atom-level targets filled in by bert_init.
#[derive(Debug, Clone, PartialEq)]
struct AtomTargets {
    vocab_targets: Vec<usize>,
    neighbors:     Vec<Vec<usize>>,
    mask:          Vec<u8>,
}

/// Features plus vocabulary targets for the self-supervised loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BertTargets<'a> {
    pub features: Option<&'a [f64]>,
    pub vocab:    &'a [usize],
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeDatapoint {
    pub compound_name: Option<String>,
    pub smiles:        String,
    pub features:      Option<Vec<f64>>,
    pub targets:       Targets,
    pub num_tasks:     usize,
    /// Present only for self-supervised datasets.
    masking:           Option<MaskGenerator>,
    atom_targets:      Option<AtomTargets>,
}

impl MoleculeDatapoint {
    /// Build a datapoint from one raw record.
    ///
    /// `features` are precomputed features for this molecule; they may not
    /// be combined with `config.features_generator`.
    pub fn new<S: AsRef<str>>(
        record:             &[S],
        config:             &DataConfig,
        features:           Option<Vec<f64>>,
        use_compound_names: bool,
    ) -> DataResult<Self> {
        if features.is_some() && config.features_generator.is_some() {
            return Err(DataError::ConflictingFeatureSources);
        }

        let mut fields = record.iter().map(AsRef::<str>::as_ref);
        let compound_name = if use_compound_names {
            Some(fields.next().ok_or(DataError::MissingSmiles)?.to_string())
        } else {
            None
        };
        let smiles = fields.next().ok_or(DataError::MissingSmiles)?.to_string();

        let features = match &config.features_generator {
            Some(names) => Some(features::generate(names, &smiles)?),
            None        => features,
        };

        let (targets, num_tasks) = if config.dataset_type.uses_placeholder_target() {
            (Targets::Dense(vec![None]), 1)
        } else {
            let dense: Vec<Option<f64>> = if config.predict_features {
                features
                    .as_ref()
                    .map(|f| f.iter().copied().map(Some).collect())
                    .unwrap_or_default()
            } else {
                let first_label_column = 1 + usize::from(use_compound_names);
                fields
                    .enumerate()
                    .map(|(i, raw)| parse_target(raw, first_label_column + i))
                    .collect::<DataResult<_>>()?
            };
            let num_tasks = dense.len();
            let targets = if config.sparse {
                Targets::Sparse(SparseLabelVector::new(&dense))
            } else {
                Targets::Dense(dense)
            };
            (targets, num_tasks)
        };

        let masking = config.is_self_supervised().then(|| {
            MaskGenerator::new(config.mask_policy, config.mask_probability)
                .with_correlation_passes(config.correlation_passes)
        });

        Ok(Self {
            compound_name,
            smiles,
            features,
            targets,
            num_tasks,
            masking,
            atom_targets: None,
        })
    }

    pub fn is_self_supervised(&self) -> bool {
        self.masking.is_some()
    }

    pub fn is_bert_initialized(&self) -> bool {
        self.atom_targets.is_some()
    }

    /// Look up atom vocabulary targets and adjacency, then build the first mask.
    pub fn bert_init<R: Rng + ?Sized>(&mut self, config: &DataConfig, rng: &mut R) -> DataResult<()> {
        if !self.is_self_supervised() {
            return Err(DataError::NotSelfSupervised("bert_init"));
        }
        let vocab = config.vocab.as_ref().ok_or(DataError::MissingVocabulary)?;
        let (vocab_targets, neighbors) = vocab.smiles_to_indices(&self.smiles)?;
        if vocab_targets.len() != neighbors.len() {
            return Err(DataError::LengthMismatch {
                expected: vocab_targets.len(),
                actual:   neighbors.len(),
            });
        }
        let num_atoms = neighbors.len();
        if let Some(&index) = neighbors.iter().flatten().find(|&&n| n >= num_atoms) {
            return Err(DataError::IndexOutOfRange { index, len: num_atoms });
        }

        self.atom_targets = Some(AtomTargets { vocab_targets, neighbors, mask: Vec::new() });
        self.recreate_mask(rng)
    }

    /// Draw a new atom mask (0 = masked) with the configured policy.
    pub fn recreate_mask<R: Rng + ?Sized>(&mut self, rng: &mut R) -> DataResult<()> {
        let generator = self.masking.ok_or(DataError::NotSelfSupervised("recreate_mask"))?;
        let atoms = self.atom_targets.as_mut().ok_or(DataError::MaskNotInitialized)?;
        atoms.mask = generator.generate(&atoms.neighbors, rng);
        Ok(())
    }

    pub fn mask(&self) -> Option<&[u8]> {
        self.atom_targets.as_ref().map(|a| a.mask.as_slice())
    }

    pub fn vocab_targets(&self) -> Option<&[usize]> {
        self.atom_targets.as_ref().map(|a| a.vocab_targets.as_slice())
    }

    pub fn neighbors(&self) -> Option<&[Vec<usize>]> {
        self.atom_targets.as_ref().map(|a| a.neighbors.as_slice())
    }

    pub fn bert_targets(&self) -> DataResult<BertTargets<'_>> {
        if !self.is_self_supervised() {
            return Err(DataError::NotSelfSupervised("bert_targets"));
        }
        let atoms = self.atom_targets.as_ref().ok_or(DataError::MaskNotInitialized)?;
        Ok(BertTargets {
            features: self.features.as_deref(),
            vocab:    &atoms.vocab_targets,
        })
    }

    /// Overwrite the targets, e.g. with pseudo-labels for unsupervised pretraining.
    pub fn set_targets(&mut self, targets: Targets) {
        self.targets = targets;
    }
}

fn parse_target(raw: &str, column: usize) -> DataResult<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::InvalidTarget { column, value: raw.to_string() })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    use rand::{rngs::StdRng, SeedableRng};

    use crate::domain::{
        config::{DatasetType, MaskPolicy},
        traits::{AtomIndices, Vocabulary},
    };

    /// One vocab index per character, atoms bonded in a chain.
    #[derive(Debug)]
    pub(crate) struct CharChainVocab;

    impl Vocabulary for CharChainVocab {
        fn smiles_to_indices(&self, smiles: &str) -> DataResult<AtomIndices> {
            let n = smiles.chars().count();
            let targets = smiles.chars().map(|c| c as usize % 16).collect();
            let neighbors = (0..n)
                .map(|i| {
                    let mut nb = Vec::new();
                    if i > 0 { nb.push(i - 1); }
                    if i + 1 < n { nb.push(i + 1); }
                    nb
                })
                .collect();
            Ok((targets, neighbors))
        }

        fn output_size(&self) -> usize {
            16
        }
    }

    pub(crate) fn bert_config(policy: MaskPolicy) -> DataConfig {
        DataConfig {
            dataset_type: DatasetType::SelfSupervised,
            mask_policy:  policy,
            vocab:        Some(Arc::new(CharChainVocab) as Arc<dyn Vocabulary>),
            ..DataConfig::default()
        }
    }

    #[test]
    fn test_dense_targets_with_missing_value() {
        let dp = MoleculeDatapoint::new(&["m1", "0.5", "", "1.2"], &DataConfig::default(), None, false).unwrap();
        assert_eq!(dp.smiles, "m1");
        assert_eq!(dp.compound_name, None);
        assert_eq!(dp.targets, Targets::Dense(vec![Some(0.5), None, Some(1.2)]));
        assert_eq!(dp.num_tasks, 3);
    }

    #[test]
    fn test_sparse_targets() {
        let cfg = DataConfig { sparse: true, ..DataConfig::default() };
        let dp = MoleculeDatapoint::new(&["m1", "0.5", "", "1.2"], &cfg, None, false).unwrap();
        assert!(dp.targets.is_sparse());
        assert_eq!(dp.targets.get(0).unwrap(), Some(0.5));
        assert_eq!(dp.targets.get(1).unwrap(), None);
        assert!(dp.targets.get(3).is_err());
        assert_eq!(dp.num_tasks, 3);
    }

    #[test]
    fn test_compound_name_column() {
        let dp = MoleculeDatapoint::new(&["aspirin", "CC(=O)O", "1"], &DataConfig::default(), None, true).unwrap();
        assert_eq!(dp.compound_name.as_deref(), Some("aspirin"));
        assert_eq!(dp.smiles, "CC(=O)O");
        assert_eq!(dp.num_tasks, 1);
    }

    #[test]
    fn test_invalid_target_names_column() {
        let err = MoleculeDatapoint::new(&["C", "1.0", "abc"], &DataConfig::default(), None, false).unwrap_err();
        assert!(matches!(err, DataError::InvalidTarget { column: 2, ref value } if value == "abc"));
    }

    #[test]
    fn test_conflicting_feature_sources() {
        let cfg = DataConfig { features_generator: Some(vec!["morgan".into()]), ..DataConfig::default() };
        let err = MoleculeDatapoint::new(&["C"], &cfg, Some(vec![1.0]), false).unwrap_err();
        assert!(matches!(err, DataError::ConflictingFeatureSources));
    }

    #[test]
    fn test_unknown_generator() {
        let cfg = DataConfig { features_generator: Some(vec!["nope".into()]), ..DataConfig::default() };
        let err = MoleculeDatapoint::new(&["C"], &cfg, None, false).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_generated_features_and_predict_features() {
        let cfg = DataConfig {
            features_generator: Some(vec!["rdkit_2d".into()]),
            predict_features:   true,
            ..DataConfig::default()
        };
        let dp = MoleculeDatapoint::new(&["CCO", "9.9"], &cfg, None, false).unwrap();
        let feats = dp.features.clone().unwrap();
        assert_eq!(dp.num_tasks, feats.len());
        assert_eq!(dp.targets.to_dense(), feats.into_iter().map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn test_unsupervised_placeholder() {
        let cfg = DataConfig { dataset_type: DatasetType::Unsupervised, ..DataConfig::default() };
        let mut dp = MoleculeDatapoint::new(&["C", "1", "2"], &cfg, None, false).unwrap();
        assert_eq!(dp.targets, Targets::Dense(vec![None]));
        assert_eq!(dp.num_tasks, 1);
        dp.set_targets(Targets::Dense(vec![Some(3.0)]));
        assert_eq!(dp.targets.get(0).unwrap(), Some(3.0));
    }

    #[test]
    fn test_bert_init_requires_self_supervised() {
        let mut dp = MoleculeDatapoint::new(&["CCO"], &DataConfig::default(), None, false).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let err = dp.bert_init(&bert_config(MaskPolicy::Random), &mut rng).unwrap_err();
        assert!(matches!(err, DataError::NotSelfSupervised("bert_init")));
        assert!(dp.recreate_mask(&mut rng).is_err());
    }

    #[test]
    fn test_recreate_mask_before_init() {
        let cfg = bert_config(MaskPolicy::Cluster);
        let mut dp = MoleculeDatapoint::new(&["CCO"], &cfg, None, false).unwrap();
        let err = dp.recreate_mask(&mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, DataError::MaskNotInitialized));
    }

    #[test]
    fn test_bert_init_missing_vocab() {
        let cfg = DataConfig { vocab: None, ..bert_config(MaskPolicy::Cluster) };
        let mut dp = MoleculeDatapoint::new(&["CCO"], &cfg, None, false).unwrap();
        let err = dp.bert_init(&cfg, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, DataError::MissingVocabulary));
    }

    #[test]
    fn test_bert_init_populates_mask_and_targets() {
        let cfg = bert_config(MaskPolicy::Cluster);
        let mut dp = MoleculeDatapoint::new(&["CCOCC", "1.0"], &cfg, None, false).unwrap();
        assert_eq!(dp.num_tasks, 1);
        assert!(!dp.is_bert_initialized());

        let mut rng = StdRng::seed_from_u64(4);
        dp.bert_init(&cfg, &mut rng).unwrap();
        assert!(dp.is_bert_initialized());
        assert_eq!(dp.mask().unwrap().len(), 5);
        assert!(dp.mask().unwrap().contains(&0));

        let bt = dp.bert_targets().unwrap();
        assert_eq!(bt.vocab.len(), 5);
        assert!(bt.features.is_none());
    }

    /// Reports an adjacency list that points past the last atom.
    #[derive(Debug)]
    struct DanglingNeighborVocab;

    impl Vocabulary for DanglingNeighborVocab {
        fn smiles_to_indices(&self, _smiles: &str) -> DataResult<AtomIndices> {
            Ok((vec![2, 3], vec![vec![5], vec![0]]))
        }

        fn output_size(&self) -> usize {
            4
        }
    }

    #[test]
    fn test_bert_init_rejects_out_of_range_neighbor() {
        let cfg = DataConfig {
            mask_probability: 1.0,
            vocab: Some(Arc::new(DanglingNeighborVocab) as Arc<dyn Vocabulary>),
            ..bert_config(MaskPolicy::Cluster)
        };
        let mut dp = MoleculeDatapoint::new(&["CO"], &cfg, None, false).unwrap();
        let err = dp.bert_init(&cfg, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, DataError::IndexOutOfRange { index: 5, len: 2 }));
        assert!(!dp.is_bert_initialized());
    }
}
