// ============================================================
// mol-data
// ============================================================
// Data representation and preprocessing for molecular property
// prediction:
//
//   cli          Layer 1 — argument parsing, dispatch
//   application  Layer 2 — prepare / vocab workflows
//   domain       Layer 3 — labels, config, errors, traits
//   data         Layer 4 — datapoints, masking, datasets, batches
//   infra        Layer 6 — vocabulary and artifact persistence

#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod infra;
