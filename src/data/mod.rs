// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from raw CSV rows all the way
// to tensor batches.
//
// The pipeline flows in this order:
//
//   molecules.csv
//       │
//       ▼
//   CsvLoader           → reads rows as raw string records
//       │
//       ▼
//   MoleculeDatapoint   → parses labels, generates features
//       │                 (smiles + features modules)
//       ▼
//   MoleculeDataset     → aggregates datapoints; bert_init builds
//       │                 atom targets and masks (mask module)
//       ▼
//   Splitter            → shuffled train / validation datasets
//       │
//       ▼
//   StandardScaler      → fitted on train, replayed on validation
//       │
//       ▼
//   MoleculeBatcher     → stacks datapoints into tensor batches
//
// Each module is responsible for exactly one step.

/// Reads CSV molecule tables and feature tables
pub mod loader;

/// SMILES tokenizer and atom graph
pub mod smiles;

/// Named molecular feature generators
pub mod features;

/// Atom masking policies for self-supervised pretraining
pub mod mask;

/// A single molecule with its labels, features and atom targets
pub mod datapoint;

/// Per-feature standardisation
pub mod scaler;

/// Collection of datapoints; implements Burn's Dataset trait
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits datasets into train/validation sets
pub mod splitter;
