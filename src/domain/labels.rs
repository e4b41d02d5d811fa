// ============================================================
// Layer 3 — Target Labels
// ============================================================
// A molecule's labels are either a dense list of optional
// floats or, for wide and mostly-empty task sets, a sparse
// vector that only stores the positions that were given.
//
//   dense:  [0.5, None, 1.2]
//   sparse: length = 3, values = {0: 0.5, 2: 1.2}
//
// Both answer get(i) with Some(value) or None.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::{DataError, DataResult};

// ─── SparseLabelVector ────────────────────────────────────────────────────────
/// Fixed-length label vector storing only the set positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseLabelVector {
    length: usize,
    values: BTreeMap<usize, f64>,
}

impl SparseLabelVector {
    /// Build from a dense list; `None` entries are not stored.
    pub fn new(dense: &[Option<f64>]) -> Self {
        let values = dense
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|x| (i, x)))
            .collect();
        Self { length: dense.len(), values }
    }

    /// Value at `index`, `None` when unset.
    pub fn get(&self, index: usize) -> DataResult<Option<f64>> {
        if index >= self.length {
            return Err(DataError::IndexOutOfRange { index, len: self.length });
        }
        Ok(self.values.get(&index).copied())
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of positions that actually hold a value.
    pub fn num_set(&self) -> usize {
        self.values.len()
    }

    pub fn to_dense(&self) -> Vec<Option<f64>> {
        (0..self.length).map(|i| self.values.get(&i).copied()).collect()
    }
}

// ─── Targets ──────────────────────────────────────────────────────────────────
/// The supervised labels attached to one datapoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Targets {
    Dense(Vec<Option<f64>>),
    Sparse(SparseLabelVector),
}

impl Targets {
    pub fn len(&self) -> usize {
        match self {
            Targets::Dense(v)  => v.len(),
            Targets::Sparse(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label at `index`; out-of-range is an error for both layouts.
    pub fn get(&self, index: usize) -> DataResult<Option<f64>> {
        match self {
            Targets::Dense(v) => v
                .get(index)
                .copied()
                .ok_or(DataError::IndexOutOfRange { index, len: v.len() }),
            Targets::Sparse(s) => s.get(index),
        }
    }

    pub fn to_dense(&self) -> Vec<Option<f64>> {
        match self {
            Targets::Dense(v)  => v.clone(),
            Targets::Sparse(s) => s.to_dense(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Targets::Sparse(_))
    }
}

impl From<Vec<Option<f64>>> for Targets {
    fn from(v: Vec<Option<f64>>) -> Self {
        Targets::Dense(v)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_get_matches_dense() {
        let dense  = vec![Some(0.5), None, Some(1.2), None];
        let sparse = SparseLabelVector::new(&dense);
        assert_eq!(sparse.len(), 4);
        assert_eq!(sparse.num_set(), 2);
        for (i, v) in dense.iter().enumerate() {
            assert_eq!(sparse.get(i).unwrap(), *v);
        }
    }

    #[test]
    fn test_sparse_out_of_range() {
        let sparse = SparseLabelVector::new(&[Some(1.0), None]);
        assert!(matches!(
            sparse.get(2),
            Err(DataError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_sparse_all_none() {
        let sparse = SparseLabelVector::new(&[None, None, None]);
        assert_eq!(sparse.len(), 3);
        assert_eq!(sparse.num_set(), 0);
        assert_eq!(sparse.get(1).unwrap(), None);
        assert_eq!(sparse.to_dense(), vec![None, None, None]);
    }

    #[test]
    fn test_targets_dense_out_of_range() {
        let t = Targets::Dense(vec![Some(1.0)]);
        assert!(t.get(1).is_err());
        assert!(!t.is_sparse());
    }
}
