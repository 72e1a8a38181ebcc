// ============================================================
// Layer 4b: Feature Builders
// ============================================================
// Everything that turns projected tables into numbers.
//
//   stats.rs        → mean / std / quantile / bucket kernels
//   base.rs         → scalar feature row per document
//   word_vectors.rs → per-dimension embedding summaries
//   raw.rs          → per-token feature matrix for sequence models

use std::collections::BTreeMap;

pub mod stats;

pub mod base;

pub mod word_vectors;

pub mod raw;

/// Feature name → value. Ordered, so every row of a collection
/// iterates its keys in the same order.
pub type FeatureRow = BTreeMap<String, f64>;
