// ============================================================
// Layer 3: Token / Sentence / Entity Tables
// ============================================================
// The projected, normalised view of one annotated document.
// These are the tables every feature builder reads from:
//
//   TokenRecord    → one row per token, case-folded word,
//                    optional commonality score
//   SentenceRecord → one row per sentence
//   EntityRecord   → zero or more rows per document
//
// Commonality score = freq_norm / corpus_count. It is None for
// words the frequency table does not know; the feature builders
// decide how a missing score is imputed, never this layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::traits::Labeled;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Case-folded surface word
    pub word: String,
    pub lemma: String,
    pub length: usize,
    pub pos: String,
    pub tag: String,
    pub alpha: bool,
    pub stop: bool,
    pub punct: bool,
    pub vector: Vec<f32>,

    /// freq_norm / count, None when the word is not in the frequency table
    pub comm_score: Option<f64>,
}

impl TokenRecord {
    /// Alphabetic, non-stopword, non-punctuation: the content words
    /// whose embeddings feed the word-vector summary.
    pub fn is_content_word(&self) -> bool {
        self.alpha && !self.stop && !self.punct
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub length: usize,
    pub noun_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Case-folded entity text
    pub entity: String,
    pub n_words: usize,
    pub length: usize,
    pub label: String,
}

/// The three tables projected from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTables {
    pub id: String,
    pub tokens: Vec<TokenRecord>,
    pub sentences: Vec<SentenceRecord>,
    pub entities: Vec<EntityRecord>,
}

// ─── FrequencyTable ───────────────────────────────────────────────────────────
/// Lowercased word → raw corpus occurrence count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    counts: HashMap<String, u64>,
}

impl FrequencyTable {
    pub fn new(counts: HashMap<String, u64>) -> Self {
        Self { counts }
    }

    /// Look up a word's count. Zero counts are treated as unknown so a
    /// commonality score can never divide by zero.
    pub fn count(&self, word: &str) -> Option<u64> {
        self.counts.get(word).copied().filter(|&c| c > 0)
    }

    /// `freq_norm / count` for a known word.
    pub fn commonality(&self, word: &str, freq_norm: f64) -> Option<f64> {
        self.count(word).map(|c| freq_norm / c as f64)
    }

    /// Smallest positive count in the table, the default normaliser for
    /// per-token raw features.
    pub fn min_count(&self) -> Option<u64> {
        self.counts.values().copied().filter(|&c| c > 0).min()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().map(|(w, c)| (w.into(), c)).collect(),
        }
    }
}

// ─── TargetRecord ─────────────────────────────────────────────────────────────
/// A document's regression label and its reported standard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: String,
    pub target: f64,
    pub standard_error: f64,
}

impl TargetRecord {
    pub fn new(id: impl Into<String>, target: f64, standard_error: f64) -> Self {
        Self {
            id: id.into(),
            target,
            standard_error,
        }
    }
}

impl Labeled for TargetRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn standard_error(&self) -> f64 {
        self.standard_error
    }

    fn with_target(&self, target: f64) -> Self {
        Self {
            target,
            ..self.clone()
        }
    }
}
