//! Least-Squares Fitting

use crate::StatsError;
use serde::{Deserialize, Serialize};

/// One-dimensional least-squares line `y = slope * x + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub offset: f64,
    /// Coefficient of determination (1.0 for a perfect fit)
    pub r_squared: f64,
}

impl LinearFit {
    /// Closed-form ordinary least squares.
    ///
    /// slope = (nΣxy − ΣxΣy) / (nΣx² − (Σx)²), offset = (Σy − slope·Σx) / n
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self, StatsError> {
        let n = xs.len().min(ys.len());
        if n < 2 {
            return Err(StatsError::InsufficientData { required: 2, actual: n });
        }
        if let Some(i) = xs[..n].iter().chain(&ys[..n]).position(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite(i % n));
        }

        let nf = n as f64;
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
        for (&x, &y) in xs.iter().zip(ys) {
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
        }

        let denom = nf * sum_xx - sum_x * sum_x;
        if denom.abs() <= 1e-12 * nf * sum_xx.abs() {
            return Err(StatsError::Degenerate("x values have no spread"));
        }

        let slope = (nf * sum_xy - sum_x * sum_y) / denom;
        let offset = (sum_y - slope * sum_x) / nf;

        let mean_y = sum_y / nf;
        let ss_tot: f64 = ys[..n].iter().map(|y| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (y - (slope * x + offset)).powi(2))
            .sum();
        let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };

        Ok(Self {
            slope,
            offset,
            r_squared,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.offset
    }
}

/// Two-dimensional affine least-squares map
///
/// `x' = x_coef[0]·x + x_coef[1]·y + x_coef[2]`, likewise for `y'`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineFit {
    pub x_coef: [f64; 3],
    pub y_coef: [f64; 3],
}

impl AffineFit {
    /// Fit from `(source, target)` point pairs via the normal equations
    pub fn fit(pairs: &[((f64, f64), (f64, f64))]) -> Result<Self, StatsError> {
        if pairs.len() < 3 {
            return Err(StatsError::InsufficientData {
                required: 3,
                actual: pairs.len(),
            });
        }
        if let Some(i) = pairs
            .iter()
            .position(|((x, y), (u, v))| ![x, y, u, v].iter().all(|c| c.is_finite()))
        {
            return Err(StatsError::NonFinite(i));
        }

        // AᵀA and Aᵀb for rows [x, y, 1]
        let mut ata = [[0.0f64; 3]; 3];
        let mut atu = [0.0f64; 3];
        let mut atv = [0.0f64; 3];
        for &((x, y), (u, v)) in pairs {
            let row = [x, y, 1.0];
            for i in 0..3 {
                for j in 0..3 {
                    ata[i][j] += row[i] * row[j];
                }
                atu[i] += row[i] * u;
                atv[i] += row[i] * v;
            }
        }

        let x_coef = solve3(ata, atu).ok_or(StatsError::Degenerate("source points are collinear"))?;
        let y_coef = solve3(ata, atv).ok_or(StatsError::Degenerate("source points are collinear"))?;
        Ok(Self { x_coef, y_coef })
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.x_coef[0] * x + self.x_coef[1] * y + self.x_coef[2],
            self.y_coef[0] * x + self.y_coef[1] * y + self.y_coef[2],
        )
    }
}

/// Solve a 3x3 system with partial pivoting
fn solve3(mut m: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    let scale = m.iter().flatten().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    for col in 0..3 {
        let pivot = (col..3).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() <= 1e-12 * scale {
            return None;
        }
        m.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..3 {
                m[row][k] -= factor * m[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let tail: f64 = ((row + 1)..3).map(|k| m[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / m[row][row];
    }
    Some(x)
}
