// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish a
// specific goal (preparing a dataset or building a vocabulary).
//
// Rules for this layer:
//   - No masking or scaling maths here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// The full preprocessing workflow
pub mod prepare_use_case;

// Standalone vocabulary building
pub mod vocab_use_case;
