// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence that doesn't belong in any business layer:
//
//   vocab_store.rs — Atom vocabulary persistence
//                    Builds the atom vocabulary from the
//                    molecule corpus, or loads one saved by an
//                    earlier run, so pretraining and fine-tuning
//                    agree on vocabulary indices.
//
//   artifacts.rs   — Preprocessing artifacts
//                    Writes config, scaler and summary JSON
//                    next to the vocabulary and reads them back.

/// Atom vocabulary building, saving, and loading
pub mod vocab_store;

/// JSON artifacts of a preprocessing run
pub mod artifacts;
