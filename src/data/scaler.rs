// ============================================================
// Layer 4 — Feature Scaler
// ============================================================
// Per-dimension standardisation: x' = (x - mean) / std.
//
// Statistics are NaN-aware (missing values are skipped), and
// degenerate dimensions are repaired so transform never
// divides by zero:
//   mean is NaN (column all missing)  → 0
//   std  is NaN or 0                  → 1
// Any NaN left after transforming is replaced by
// `replace_nan_token`.
//
// A fitted scaler is serialisable so the exact transform used
// on the training set can be replayed on validation/test data.

use serde::{Deserialize, Serialize};

use crate::domain::error::{DataError, DataResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means:             Vec<f64>,
    stds:              Vec<f64>,
    replace_nan_token: f64,
}

impl StandardScaler {
    /// Fit on a row-major matrix (one row per datapoint).
    pub fn fit(rows: &[Vec<f64>], replace_nan_token: f64) -> DataResult<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(DataError::LengthMismatch { expected: dim, actual: bad.len() });
        }

        let mut means = Vec::with_capacity(dim);
        let mut stds  = Vec::with_capacity(dim);

        for j in 0..dim {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).filter(|x| !x.is_nan()).collect();
            if column.is_empty() {
                means.push(0.0);
                stds.push(1.0);
                continue;
            }
            let n    = column.len() as f64;
            let mean = column.iter().sum::<f64>() / n;
            let var  = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let std  = var.sqrt();
            means.push(mean);
            stds.push(if std == 0.0 || std.is_nan() { 1.0 } else { std });
        }

        tracing::debug!("Fitted scaler over {} rows x {} features", rows.len(), dim);
        Ok(Self { means, stds, replace_nan_token })
    }

    /// Build from known parameters.
    pub fn from_parts(means: Vec<f64>, stds: Vec<f64>, replace_nan_token: f64) -> DataResult<Self> {
        if means.len() != stds.len() {
            return Err(DataError::LengthMismatch { expected: means.len(), actual: stds.len() });
        }
        Ok(Self { means, stds, replace_nan_token })
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    pub fn num_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, x: &[f64]) -> DataResult<Vec<f64>> {
        self.check_dim(x)?;
        Ok(x.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| self.fill_nan((v - m) / s))
            .collect())
    }

    pub fn transform_batch(&self, rows: &[Vec<f64>]) -> DataResult<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn inverse_transform(&self, x: &[f64]) -> DataResult<Vec<f64>> {
        self.check_dim(x)?;
        Ok(x.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| self.fill_nan(v * s + m))
            .collect())
    }

    fn fill_nan(&self, v: f64) -> f64 {
        if v.is_nan() { self.replace_nan_token } else { v }
    }

    fn check_dim(&self, x: &[f64]) -> DataResult<()> {
        if x.len() != self.means.len() {
            return Err(DataError::LengthMismatch { expected: self.means.len(), actual: x.len() });
        }
        Ok(())
    }
}
