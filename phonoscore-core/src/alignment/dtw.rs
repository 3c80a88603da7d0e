//! Dynamic time warping.
//!
//! ## Recurrence
//!
//! ```text
//! D[0][0] = 0
//! D[i][0] = D[0][j] = +inf            (i, j > 0)
//! D[i][j] = |a[i-1] - b[j-1]|₂ + min(D[i-1][j], D[i][j-1], D[i-1][j-1])
//! score   = D[n][m]
//! ```
//!
//! The infinite border forces every path to start at (0, 0); a zero border
//! would let a path enter mid-sequence and skip the frames it dislikes.
//! No step-size or band constraint is applied.
//!
//! Costs accumulate in f64 so long recordings do not lose the small
//! differences that separate near-identical attempts.

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{Result, ScoreError};
use crate::features::FeatureSequence;

/// DTW dissimilarity between two feature sequences. 0 only for identical input.
pub fn align(a: &FeatureSequence, b: &FeatureSequence) -> Result<f64> {
    align_frames(a.view(), b.view())
}

/// DTW over raw frames × coefficients matrices, keeping two rows.
///
/// The shorter sequence indexes the rows kept in memory, so space is
/// O(min(n, m)).
///
/// # Errors
/// - `ScoreError::EmptySequence` if either side has no frames.
/// - `ScoreError::DimensionMismatch` if the coefficient counts differ.
pub fn align_frames(a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>) -> Result<f64> {
    check_shapes(&a, &b)?;

    // DTW with a symmetric local cost is symmetric, so the operands can be
    // swapped to keep the shorter one on the inner axis.
    let (outer, inner) = if a.nrows() >= b.nrows() { (a, b) } else { (b, a) };
    let m = inner.nrows();

    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for row in outer.rows() {
        curr[0] = f64::INFINITY;
        for j in 1..=m {
            let cost = euclidean(row, inner.row(j - 1));
            let best = prev[j].min(curr[j - 1]).min(prev[j - 1]);
            curr[j] = cost + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    Ok(prev[m])
}

/// The full `(n+1) × (m+1)` accumulated-cost matrix, for inspection and
/// plotting. `matrix[[n, m]]` equals [`align_frames`] on the same input.
pub fn cost_matrix(a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>) -> Result<Array2<f64>> {
    check_shapes(&a, &b)?;
    let (n, m) = (a.nrows(), b.nrows());

    let mut d = Array2::<f64>::from_elem((n + 1, m + 1), f64::INFINITY);
    d[[0, 0]] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            let cost = euclidean(a.row(i - 1), b.row(j - 1));
            let best = d[[i - 1, j]].min(d[[i, j - 1]]).min(d[[i - 1, j - 1]]);
            d[[i, j]] = cost + best;
        }
    }
    Ok(d)
}

fn check_shapes(a: &ArrayView2<'_, f32>, b: &ArrayView2<'_, f32>) -> Result<()> {
    if a.nrows() == 0 || b.nrows() == 0 {
        return Err(ScoreError::EmptySequence);
    }
    if a.ncols() != b.ncols() {
        return Err(ScoreError::DimensionMismatch {
            expected: a.ncols(),
            found: b.ncols(),
        });
    }
    Ok(())
}

fn euclidean(x: ArrayView1<'_, f32>, y: ArrayView1<'_, f32>) -> f64 {
    x.iter()
        .zip(y.iter())
        .map(|(&p, &q)| {
            let d = f64::from(p) - f64::from(q);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
