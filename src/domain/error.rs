// ============================================================
// Layer 3 — Error Types
// ============================================================
// Every failure the data layer can report. The application and
// CLI layers wrap these in anyhow with extra context; only the
// worker-pool build failure is recovered locally (see
// MoleculeDataset::bert_init).

use thiserror::Error;

/// Errors raised while building or transforming molecule datasets.
#[derive(Debug, Error)]
pub enum DataError {
    /// Precomputed features were passed while a generator list is configured.
    #[error("cannot provide both precomputed features and a features generator")]
    ConflictingFeatureSources,

    /// Generator name not present in the registry.
    #[error("features generator \"{0}\" not supported")]
    UnsupportedFeaturesGenerator(String),

    /// Mask policy name not recognised.
    #[error("mask policy \"{0}\" not supported")]
    UnsupportedMaskPolicy(String),

    /// Dataset type name not recognised.
    #[error("dataset type \"{0}\" not supported")]
    UnsupportedDatasetType(String),

    /// A label field that is neither empty nor a float.
    #[error("invalid target value \"{value}\" in column {column}")]
    InvalidTarget { column: usize, value: String },

    /// A record with no SMILES column.
    #[error("record is missing the SMILES column")]
    MissingSmiles,

    /// Operation only valid for self-supervised datasets.
    #[error("{0} requires the self_supervised dataset type")]
    NotSelfSupervised(&'static str),

    /// bert_init called without a vocabulary in the configuration.
    #[error("no vocabulary available; build or load one before bert_init")]
    MissingVocabulary,

    /// recreate_mask called before bert_init populated the atom targets.
    #[error("atom targets not initialised; call bert_init first")]
    MaskNotInitialized,

    /// Sparse label lookup, or an atom neighbour index, beyond the valid range.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Two sequences that must be aligned have different lengths.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Caller passed an argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Vocabulary build/load failure.
    #[error("vocabulary error: {0}")]
    Vocab(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialisation error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the data layer.
pub type DataResult<T> = std::result::Result<T, DataError>;
