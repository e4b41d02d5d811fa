// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams where the data layer meets its collaborators:
//
//   RecordSource → anything that yields raw rows of strings
//                  (CsvLoader in the data layer)
//   Vocabulary   → maps a SMILES string to per-atom vocabulary
//                  indices plus the atom adjacency lists
//                  (AtomVocab in the infra layer)
//
// Both are object-safe so they can be boxed or shared behind Arc.

use crate::domain::error::DataResult;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Any component that can produce raw records.
///
/// A record is `[compound_name?, smiles, label*]`, every field a string.
pub trait RecordSource {
    fn load_all(&self) -> DataResult<Vec<Vec<String>>>;
}

// ─── Vocabulary ───────────────────────────────────────────────────────────────
/// Per-atom vocabulary indices plus atom adjacency for one molecule.
pub type AtomIndices = (Vec<usize>, Vec<Vec<usize>>);

/// Corpus-wide atom vocabulary used for masked self-supervised targets.
///
/// Shared read-only between bert_init workers, hence `Send + Sync`.
pub trait Vocabulary: Send + Sync + std::fmt::Debug {
    /// Returns `(targets, neighbors)` where `targets[i]` is the vocabulary
    /// index of atom `i` and `neighbors[i]` lists the atoms bonded to it.
    fn smiles_to_indices(&self, smiles: &str) -> DataResult<AtomIndices>;

    /// Number of distinct classes a model must predict.
    fn output_size(&self) -> usize;
}
