// ============================================================
// Layer 4: Resampler / Upscaler
// ============================================================
// Two independent operations that grow or reshape data for
// training:
//
// even_upsample(rows, n_row = R, n_rep = N)
//   Produces N replicates (group ids 0..N-1) of exactly R rows.
//
//   len ≥ R:  each replicate is an independent random sample of
//             R rows without replacement
//   len < R:  each replicate is ⌊R / len⌋ full copies of all rows
//             in their original order, then a random sample
//             without replacement of the remaining R mod len rows
//
//   Example, 3 rows [a b c], R = 7:
//     a b c a b c + one of {a, b, c}
//
//   Long documents lose rows, short ones repeat rows, and every
//   replicate ends up with the same shape.
//
// upscale_targets(rows, n = K)
//   Each row becomes K rows whose target is
//   target + standard_error · z,  z ~ N(0, 1).
//   Everything else about the row is copied. K ≤ 1 returns the
//   input unchanged.
//
// Both take the random source as an argument; a seeded StdRng
// makes runs repeatable.

use rand::seq::index;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::domain::{FeatureError, FeatureResult, Labeled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Rows per replicate
    pub n_row: usize,
    /// Replicates per document
    pub n_rep: usize,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self { n_row: 100, n_rep: 10 }
    }
}

/// One fixed-size replicate drawn from a document's rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Replicate<T> {
    pub group_id: usize,
    pub rows: Vec<T>,
}

/// Draw `n_rep` replicates of exactly `n_row` rows each.
pub fn even_upsample<T, R>(
    rows: &[T],
    n_row: usize,
    n_rep: usize,
    rng: &mut R,
) -> FeatureResult<Vec<Replicate<T>>>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if n_row == 0 || n_rep == 0 {
        return Err(FeatureError::InvalidParameter(format!(
            "n_row and n_rep must be positive (got {n_row}, {n_rep})"
        )));
    }
    if rows.is_empty() {
        return Err(FeatureError::EmptyInput(
            "cannot resample an empty row set".to_string(),
        ));
    }

    let len = rows.len();
    let replicates = (0..n_rep)
        .map(|group_id| {
            let mut out = Vec::with_capacity(n_row);

            if len >= n_row {
                out.extend(index::sample(rng, len, n_row).into_iter().map(|i| rows[i].clone()));
            } else {
                for _ in 0..n_row / len {
                    out.extend_from_slice(rows);
                }
                let remainder = n_row % len;
                if remainder > 0 {
                    out.extend(
                        index::sample(rng, len, remainder)
                            .into_iter()
                            .map(|i| rows[i].clone()),
                    );
                }
            }

            Replicate { group_id, rows: out }
        })
        .collect();

    Ok(replicates)
}

/// Expand every labelled row into `n` rows with noisy targets.
///
/// The `n` copies of a row are emitted consecutively, in input order.
pub fn upscale_targets<T, R>(rows: &[T], n: usize, rng: &mut R) -> FeatureResult<Vec<T>>
where
    T: Labeled,
    R: Rng + ?Sized,
{
    if n <= 1 {
        return Ok(rows.to_vec());
    }

    let mut out = Vec::with_capacity(rows.len() * n);
    for row in rows {
        let se = row.standard_error();
        if se.is_nan() || se < 0.0 {
            return Err(FeatureError::InvalidParameter(format!(
                "document '{}' has standard error {se}",
                row.id()
            )));
        }
        for _ in 0..n {
            let z: f64 = rng.sample(StandardNormal);
            out.push(row.with_target(row.target() + se * z));
        }
    }

    tracing::debug!("Upscaled {} target rows to {}", rows.len(), out.len());
    Ok(out)
}
