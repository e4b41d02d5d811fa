// ============================================================
// Layer 3 — Data Configuration
// ============================================================
// Options shared by every datapoint in a dataset. The CLI
// converts its clap arguments into this struct; library callers
// build it directly (DataConfig::default() plus field updates).
//
// Two fields are filled in at run time by
// MoleculeDataset::bert_init rather than by the user:
//   - vocab / vocab_output_size  (corpus-wide atom vocabulary)
//   - features_size              (taken from the first datapoint)
//
// The vocabulary itself is not serialised; only its output size
// is written with the rest of the config.

use std::{fmt, path::PathBuf, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::domain::error::DataError;
use crate::domain::traits::Vocabulary;

// ─── DatasetType ──────────────────────────────────────────────────────────────
/// What the targets of a dataset are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetType {
    /// Labels come from the trailing record fields.
    #[default]
    Supervised,
    /// Single placeholder target, set later via set_targets.
    Unsupervised,
    /// Masked atom-vocabulary prediction ("BERT-style" pretraining).
    SelfSupervised,
}

impl DatasetType {
    /// Whether trailing record fields are ignored in favour of a placeholder.
    pub fn uses_placeholder_target(self) -> bool {
        matches!(self, DatasetType::Unsupervised | DatasetType::SelfSupervised)
    }
}

impl FromStr for DatasetType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supervised" | "regression" | "classification" => Ok(DatasetType::Supervised),
            "unsupervised"                                   => Ok(DatasetType::Unsupervised),
            "self_supervised" | "bert_pretraining"           => Ok(DatasetType::SelfSupervised),
            other => Err(DataError::UnsupportedDatasetType(other.to_string())),
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatasetType::Supervised     => "supervised",
            DatasetType::Unsupervised   => "unsupervised",
            DatasetType::SelfSupervised => "self_supervised",
        };
        f.write_str(s)
    }
}

// ─── MaskPolicy ───────────────────────────────────────────────────────────────
/// How atoms are chosen for masking in self-supervised mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskPolicy {
    /// Mask an atom together with its direct neighbours.
    #[default]
    Cluster,
    /// I.i.d. mask, then smoothed towards neighbour agreement.
    Correlation,
    /// I.i.d. Bernoulli mask per atom.
    Random,
}

impl FromStr for MaskPolicy {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cluster"     => Ok(MaskPolicy::Cluster),
            "correlation" => Ok(MaskPolicy::Correlation),
            "random"      => Ok(MaskPolicy::Random),
            other => Err(DataError::UnsupportedMaskPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for MaskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MaskPolicy::Cluster     => "cluster",
            MaskPolicy::Correlation => "correlation",
            MaskPolicy::Random      => "random",
        };
        f.write_str(s)
    }
}

// ─── DataConfig ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub dataset_type:       DatasetType,
    /// Ordered generator names; sub-vectors are concatenated in this order.
    pub features_generator: Option<Vec<String>>,
    /// Use the feature vector as the regression target.
    pub predict_features:   bool,
    /// Store labels as a SparseLabelVector.
    pub sparse:             bool,
    pub mask_probability:   f64,
    pub mask_policy:        MaskPolicy,
    /// Neighbour-copy passes for the correlation policy; None = one per atom.
    pub correlation_passes: Option<usize>,
    /// Force single-threaded bert_init.
    pub sequential:         bool,
    /// Worker threads for bert_init; 0 lets rayon decide.
    pub num_workers:        usize,
    /// The first entry is searched for a saved vocabulary.
    pub checkpoint_paths:   Option<Vec<PathBuf>>,
    pub features_size:      Option<usize>,
    pub vocab_output_size:  Option<usize>,
    #[serde(skip)]
    pub vocab:              Option<Arc<dyn Vocabulary>>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_type:       DatasetType::Supervised,
            features_generator: None,
            predict_features:   false,
            sparse:             false,
            mask_probability:   0.15,
            mask_policy:        MaskPolicy::Cluster,
            correlation_passes: None,
            sequential:         false,
            num_workers:        0,
            checkpoint_paths:   None,
            features_size:      None,
            vocab_output_size:  None,
            vocab:              None,
        }
    }
}

impl DataConfig {
    pub fn is_self_supervised(&self) -> bool {
        self.dataset_type == DatasetType::SelfSupervised
    }
}
