// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `prepare` and `vocab`
// and all their configurable flags.
//
// Free-text options (dataset type, mask policy) are validated
// when the args are converted, so a typo fails before any file
// is read.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::prepare_use_case::PrepareConfig;
use crate::domain::{config::DataConfig, error::DataError};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, featurise, split and normalise a molecule table
    Prepare(PrepareArgs),

    /// Build an atom vocabulary from a molecule table
    Vocab(VocabArgs),
}

/// All arguments for the `prepare` command.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// CSV with a header row: [name,] smiles, label...
    #[arg(long)]
    pub data_path: PathBuf,

    /// Directory for config.json, scaler.json, summary.json, vocab.json
    #[arg(long, default_value = "prepared")]
    pub output_dir: PathBuf,

    /// supervised | unsupervised | self_supervised
    /// (aliases: regression, classification, bert_pretraining)
    #[arg(long, default_value = "supervised")]
    pub dataset_type: String,

    /// Feature generators to run per molecule, e.g. morgan rdkit_2d
    #[arg(long, num_args = 1..)]
    pub features_generator: Option<Vec<String>>,

    /// CSV of precomputed features, one row per molecule
    #[arg(long, conflicts_with = "features_generator")]
    pub features_path: Option<PathBuf>,

    /// Use the generated features as regression targets
    #[arg(long)]
    pub predict_features: bool,

    /// Store labels sparsely (for tables with mostly missing labels)
    #[arg(long)]
    pub sparse: bool,

    /// First column is a compound name, SMILES is second
    #[arg(long)]
    pub use_compound_names: bool,

    /// cluster | correlation | random
    #[arg(long, default_value = "cluster")]
    pub mask_policy: String,

    /// Target fraction of atoms to mask
    #[arg(long, default_value_t = 0.15)]
    pub mask_probability: f64,

    /// Neighbour-copy passes for the correlation policy (default: atom count)
    #[arg(long)]
    pub correlation_passes: Option<usize>,

    /// Initialise atom targets on the calling thread
    #[arg(long)]
    pub sequential: bool,

    /// Worker threads for target initialisation; 0 lets rayon decide
    #[arg(long, default_value_t = 0)]
    pub num_workers: usize,

    /// Load the atom vocabulary from here instead of building it
    #[arg(long = "checkpoint-path")]
    pub checkpoint_paths: Option<Vec<PathBuf>>,

    /// Proportion of molecules used for training
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Split the training set into this many worker shards
    #[arg(long, default_value_t = 1)]
    pub num_chunks: usize,

    /// Only read the first N molecules
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Seed for shuffling and masking
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Build the library config from CLI args.
/// The library never sees clap types.
impl TryFrom<&PrepareArgs> for DataConfig {
    type Error = DataError;

    fn try_from(a: &PrepareArgs) -> Result<Self, Self::Error> {
        if !(0.0..=1.0).contains(&a.mask_probability) {
            return Err(DataError::InvalidArgument(format!(
                "mask probability must be within [0, 1], got {}",
                a.mask_probability
            )));
        }
        Ok(DataConfig {
            dataset_type:       a.dataset_type.parse()?,
            features_generator: a.features_generator.clone(),
            predict_features:   a.predict_features,
            sparse:             a.sparse,
            mask_probability:   a.mask_probability,
            mask_policy:        a.mask_policy.parse()?,
            correlation_passes: a.correlation_passes,
            sequential:         a.sequential,
            num_workers:        a.num_workers,
            checkpoint_paths:   a.checkpoint_paths.clone(),
            ..DataConfig::default()
        })
    }
}

impl TryFrom<PrepareArgs> for PrepareConfig {
    type Error = DataError;

    fn try_from(a: PrepareArgs) -> Result<Self, Self::Error> {
        let data = DataConfig::try_from(&a)?;
        Ok(PrepareConfig {
            data_path:          a.data_path,
            output_dir:         a.output_dir,
            features_path:      a.features_path,
            use_compound_names: a.use_compound_names,
            max_rows:           a.max_rows,
            train_fraction:     a.train_fraction,
            num_chunks:         a.num_chunks,
            seed:               a.seed,
            data,
        })
    }
}

/// All arguments for the `vocab` command
#[derive(Args, Debug)]
pub struct VocabArgs {
    /// CSV with a header row: [name,] smiles, ...
    #[arg(long)]
    pub data_path: PathBuf,

    /// Directory to write vocab.json into
    #[arg(long, default_value = "vocab")]
    pub output_dir: PathBuf,

    /// First column is a compound name, SMILES is second
    #[arg(long)]
    pub use_compound_names: bool,

    /// Only read the first N molecules
    #[arg(long)]
    pub max_rows: Option<usize>,
}
