// ============================================================
// Layer 4b: Raw Per-Token Feature Builder
// ============================================================
// Builds the row-level matrix that sequence-style models read:
// one row per token, original order kept through `seq`.
//
// Column layout (all numeric, booleans as 0/1):
//
//   seq, length / len_norm, alpha, stop, punct,
//   [comm_score]                     ← only with a frequency table
//   v0 .. v{D-1}  (vector / vec_norm)
//   [tag_<CANON> ...]                ← only with a tag table; one
//                                      column per canonical tag that
//                                      actually occurs, sorted
//
// Commonality imputation:
//   known word                       → freq_norm / count
//   unknown alphabetic non-stopword  → unknown_comm_score
//   everything else                  → 0
//
// Tokens whose raw tag is missing from the tag table are dropped.
// Rows are emitted in ascending `seq` and every later stage that
// regroups rows relies on that order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::tag_map::TagTable;
use crate::domain::{AnnotatedDocument, FeatureError, FeatureResult, FrequencyTable};

pub const TAG_COLUMN_PREFIX: &str = "tag_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFeatureConfig {
    /// Divisor applied to token character length
    pub len_norm: f64,

    /// Divisor applied to every embedding component
    pub vec_norm: f64,

    /// Expected embedding dimensionality, checked when set
    pub embedding_dim: Option<usize>,

    /// Commonality numerator; the frequency table's smallest count when None
    pub freq_norm: Option<f64>,

    /// Score given to alphabetic non-stopwords missing from the frequency table
    pub unknown_comm_score: f64,
}

impl Default for RawFeatureConfig {
    fn default() -> Self {
        Self {
            len_norm: 20.0,
            vec_norm: 10.0,
            embedding_dim: None,
            freq_norm: None,
            unknown_comm_score: 0.5,
        }
    }
}

/// One token's features. `values` lines up with the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub seq: usize,
    pub word: String,
    pub values: Vec<f64>,
}

/// Per-token features of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeatureTable {
    pub id: String,
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawFeatureTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Every value of one column, in row order.
    pub fn column(&self, name: &str) -> FeatureResult<Vec<f64>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| FeatureError::UnknownColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn is_tag_column(name: &str) -> bool {
    name.starts_with(TAG_COLUMN_PREFIX)
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Build the per-token feature table of one document.
pub fn gen_raw_word_features(
    doc: &AnnotatedDocument,
    tag_table: Option<&TagTable>,
    freq: Option<&FrequencyTable>,
    cfg: &RawFeatureConfig,
) -> FeatureResult<RawFeatureTable> {
    doc.validate(cfg.embedding_dim)?;
    if cfg.len_norm <= 0.0 || cfg.vec_norm <= 0.0 {
        return Err(FeatureError::InvalidParameter(
            "len_norm and vec_norm must be positive".to_string(),
        ));
    }

    let dim = cfg.embedding_dim.or(doc.embedding_dim()).unwrap_or(0);

    let freq_norm = match (freq, cfg.freq_norm) {
        (None, _) => None,
        (Some(_), Some(n)) => Some(n),
        (Some(f), None) => Some(f.min_count().ok_or_else(|| {
            FeatureError::InvalidParameter("frequency table has no positive counts".to_string())
        })? as f64),
    };

    // ── Resolve canonical tags, dropping tokens the tag table does not know ──
    let mut kept: Vec<(usize, Option<&str>)> = Vec::with_capacity(doc.tokens.len());
    let mut dropped = 0usize;
    for (seq, token) in doc.tokens.iter().enumerate() {
        match tag_table {
            Some(table) => match table.lookup(&token.tag) {
                Some(canon) => kept.push((seq, Some(canon))),
                None => dropped += 1,
            },
            None => kept.push((seq, None)),
        }
    }
    if dropped > 0 {
        tracing::warn!(
            "Document '{}': dropped {} tokens with tags missing from the tag table",
            doc.id,
            dropped
        );
    }
    kept.sort_by_key(|&(seq, _)| seq);

    let present_tags: Vec<&str> = kept
        .iter()
        .filter_map(|&(_, canon)| canon)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // ── Column layout ─────────────────────────────────────────────────────────
    let mut columns: Vec<String> = ["seq", "length", "alpha", "stop", "punct"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    if freq_norm.is_some() {
        columns.push("comm_score".to_string());
    }
    columns.extend((0..dim).map(|i| format!("v{i}")));
    columns.extend(present_tags.iter().map(|t| format!("{TAG_COLUMN_PREFIX}{t}")));

    // ── Rows ──────────────────────────────────────────────────────────────────
    let rows = kept
        .iter()
        .map(|&(seq, canon)| {
            let token = &doc.tokens[seq];
            let word = token.text.to_lowercase();

            let mut values = Vec::with_capacity(columns.len());
            values.push(seq as f64);
            values.push(token.length as f64 / cfg.len_norm);
            values.push(flag(token.is_alpha));
            values.push(flag(token.is_stop));
            values.push(flag(token.is_punct));

            if let (Some(table), Some(norm)) = (freq, freq_norm) {
                let score = match table.count(&word) {
                    Some(count) => norm / count as f64,
                    None if token.is_alpha && !token.is_stop => cfg.unknown_comm_score,
                    None => 0.0,
                };
                values.push(score);
            }

            values.extend(token.vector.iter().map(|&v| v as f64 / cfg.vec_norm));

            for tag in &present_tags {
                values.push(flag(canon == Some(*tag)));
            }

            RawRow { seq, word, values }
        })
        .collect();

    Ok(RawFeatureTable {
        id: doc.id.clone(),
        columns,
        rows,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::projection::fixtures;
    use crate::data::tag_map::normalize_tags;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn freq() -> FrequencyTable {
        [("quick", 400u64), ("fox", 100), ("the", 10_000), ("over", 5_000)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_one_row_per_token_in_order() {
        let doc = fixtures::fox_document();
        let t = gen_raw_word_features(&doc, None, None, &RawFeatureConfig::default()).unwrap();
        assert_eq!(t.len(), doc.tokens.len());
        let seqs: Vec<usize> = t.rows.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, (0..doc.tokens.len()).collect::<Vec<_>>());
        assert_eq!(
            t.columns,
            vec!["seq", "length", "alpha", "stop", "punct", "v0", "v1", "v2"]
        );
    }

    #[test]
    fn test_length_and_vectors_normalised() {
        let t = gen_raw_word_features(&fixtures::fox_document(), None, None, &RawFeatureConfig::default()).unwrap();
        let quick = &t.rows[1];
        assert_eq!(quick.word, "quick");
        assert!(close(quick.values[1], 5.0 / 20.0));
        assert!(close(quick.values[5], 0.1));
        assert!(close(quick.values[6], -0.2));
    }

    #[test]
    fn test_commonality_imputation_policy() {
        let cfg = RawFeatureConfig::default();
        let t = gen_raw_word_features(&fixtures::fox_document(), None, Some(&freq()), &cfg).unwrap();
        let comm = t.column("comm_score").unwrap();
        // freq_norm defaults to the smallest count (100)
        assert!(close(comm[1], 100.0 / 400.0)); // quick, known
        assert!(close(comm[2], 1.0)); // fox, known
        assert!(close(comm[3], 0.5)); // jumped, unknown alpha non-stop
        assert!(close(comm[0], 100.0 / 10_000.0)); // The → "the", known stopword
        assert!(close(comm[9], 0.0)); // ".", unknown punctuation
    }

    #[test]
    fn test_unknown_stopword_scores_zero() {
        let mut doc = fixtures::fox_document();
        doc.tokens[4].text = "upon".to_string();
        let cfg = RawFeatureConfig {
            freq_norm: Some(1.0),
            unknown_comm_score: 0.9,
            ..RawFeatureConfig::default()
        };
        let t = gen_raw_word_features(&doc, None, Some(&freq()), &cfg).unwrap();
        let comm = t.column("comm_score").unwrap();
        assert_eq!(comm[4], 0.0);
        assert!(close(comm[3], 0.9));
    }

    #[test]
    fn test_tag_columns_only_for_present_tags() {
        let table = normalize_tags(["DT", "JJ", "NN", "VBD", "IN", "RB", ".", "$", "PRP$"], None);
        let t = gen_raw_word_features(&fixtures::fox_document(), Some(&table), None, &RawFeatureConfig::default()).unwrap();
        let tag_cols: Vec<&String> = t.columns.iter().filter(|c| is_tag_column(c)).collect();
        assert_eq!(
            tag_cols,
            vec!["tag_DT", "tag_IN", "tag_JJ", "tag_NN", "tag_PUNCT", "tag_RB", "tag_VBD"]
        );
        let dt = t.column("tag_DT").unwrap();
        assert_eq!(dt[0], 1.0);
        assert_eq!(dt[1], 0.0);
        // every row is one-hot across the tag block
        for row in &t.rows {
            let start = t.column_index("tag_DT").unwrap();
            assert_eq!(row.values[start..].iter().sum::<f64>(), 1.0);
        }
    }

    #[test]
    fn test_tokens_with_unknown_tags_dropped_and_order_kept() {
        let table = normalize_tags(["DT", "JJ", "NN"], None);
        let t = gen_raw_word_features(&fixtures::fox_document(), Some(&table), None, &RawFeatureConfig::default()).unwrap();
        let seqs: Vec<usize> = t.rows.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 5, 7, 8]);
    }

    #[test]
    fn test_embedding_dim_checked() {
        let cfg = RawFeatureConfig {
            embedding_dim: Some(96),
            ..RawFeatureConfig::default()
        };
        let err = gen_raw_word_features(&fixtures::fox_document(), None, None, &cfg).unwrap_err();
        assert!(matches!(err, FeatureError::MalformedAnnotation { .. }));
    }
}
