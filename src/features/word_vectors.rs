// ============================================================
// Layer 4b: Word-Vector Summarizer
// ============================================================
// Compresses the embeddings of a document's content words
// (alphabetic, non-stopword, non-punctuation) into a handful of
// scalars per embedding dimension. Two interchangeable modes:
//
//   QuantileValues { percentiles }  → vec_<d>_q<pct> for each
//       percentile, plus vec_<d>_frac_pos (share of values > 0)
//
//   QuantileMeans { nq }            → vec_<d>_q<k>, k = 1..=nq:
//       sort the dimension's values, cut them into nq contiguous
//       equal-frequency rank ranges, report each range's mean
//
// No content words means no summary: EmptyInput, never a row of
// NaNs.

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureError, FeatureResult, TokenRecord};
use crate::features::stats::{mean, quantile_sorted, sorted};
use crate::features::FeatureRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VectorSummary {
    QuantileValues { percentiles: Vec<u32> },
    QuantileMeans { nq: usize },
}

impl Default for VectorSummary {
    fn default() -> Self {
        VectorSummary::QuantileValues {
            percentiles: vec![20, 80],
        }
    }
}

/// Summarise the embeddings of the content words in `tokens`.
pub fn summarize_word_vectors(
    tokens: &[TokenRecord],
    mode: &VectorSummary,
) -> FeatureResult<FeatureRow> {
    let content: Vec<&TokenRecord> = tokens.iter().filter(|t| t.is_content_word()).collect();
    let dim = match content.first() {
        Some(t) => t.vector.len(),
        None => {
            return Err(FeatureError::EmptyInput(
                "no content words for word-vector summary".to_string(),
            ))
        }
    };

    if let VectorSummary::QuantileMeans { nq: 0 } = mode {
        return Err(FeatureError::InvalidParameter(
            "quantile bucket count must be at least 1".to_string(),
        ));
    }

    let mut out = FeatureRow::new();
    for d in 0..dim {
        let column: Vec<f64> = content
            .iter()
            .map(|t| t.vector.get(d).copied().unwrap_or(0.0) as f64)
            .collect();
        let column = sorted(&column);

        match mode {
            VectorSummary::QuantileValues { percentiles } => {
                for &pct in percentiles {
                    let q = quantile_sorted(&column, pct as f64 / 100.0)?;
                    out.insert(format!("vec_{d}_q{pct}"), q);
                }
                let positive = column.iter().filter(|&&v| v > 0.0).count();
                out.insert(
                    format!("vec_{d}_frac_pos"),
                    positive as f64 / column.len() as f64,
                );
            }
            VectorSummary::QuantileMeans { nq } => {
                for (k, m) in bucket_means(&column, *nq).into_iter().enumerate() {
                    out.insert(format!("vec_{d}_q{}", k + 1), m);
                }
            }
        }
    }

    Ok(out)
}

/// Means of `nq` equal-frequency rank ranges of an ascending slice.
/// With fewer values than buckets a range falls back to the single
/// order statistic at its start, so no bucket is ever empty.
fn bucket_means(sorted: &[f64], nq: usize) -> Vec<f64> {
    let n = sorted.len();
    (0..nq)
        .map(|k| {
            let lo = (k * n / nq).min(n - 1);
            let hi = ((k + 1) * n / nq).max(lo + 1);
            mean(&sorted[lo..hi]).unwrap_or(0.0)
        })
        .collect()
}
