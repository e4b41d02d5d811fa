// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that define what the data layer
// talks about: labels, configuration, errors and the two
// collaborator traits.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - NO clap types

/// Error enum and result alias
pub mod error;

/// Dense and sparse target labels
pub mod labels;

/// DataConfig, DatasetType, MaskPolicy
pub mod config;

/// RecordSource and Vocabulary collaborator traits
pub mod traits;
