//! Pairwise correlation matrix over per-holding return series

use crate::error::{Result, RiskError};
use crate::returns::ReturnSeries;
use crate::stats;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Symmetric correlation matrix with unit diagonal
///
/// Rows and columns follow `symbols`, which is the holding order at the
/// time of computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    pub matrix: DMatrix<f64>,
}

impl CorrelationMatrix {
    /// Compute correlations for each pair once (i < j) and mirror them
    ///
    /// All series must have the same length (at least 2). Entries are
    /// clamped to [-1, 1] to absorb rounding.
    pub fn compute(symbols: Vec<String>, series: &[ReturnSeries]) -> Result<Self> {
        let n = series.len();
        if n == 0 {
            return Err(RiskError::InsufficientData(
                "Correlation matrix requires at least 1 series".to_string(),
            ));
        }
        if symbols.len() != n {
            return Err(RiskError::LengthMismatch {
                left: symbols.len(),
                right: n,
            });
        }

        let mut matrix = DMatrix::identity(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let rho = stats::correlation(series[i].as_slice(), series[j].as_slice())?
                    .clamp(-1.0, 1.0);
                matrix[(i, j)] = rho;
                matrix[(j, i)] = rho;
            }
        }

        Ok(Self { symbols, matrix })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Correlation between two symbols, if both are present
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        Some(self.matrix[(i, j)])
    }

    /// Average of the off-diagonal entries, 0 for a single series
    pub fn average_correlation(&self) -> f64 {
        let n = self.len();
        if n < 2 {
            return 0.0;
        }
        let off_diagonal: f64 = self.matrix.sum() - n as f64;
        off_diagonal / (n * (n - 1)) as f64
    }
}
