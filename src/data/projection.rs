// ============================================================
// Layer 4: Token / Sentence / Entity Projection
// ============================================================
// Converts one AnnotatedDocument into the three tables the
// feature builders consume. Pure projection, no side effects:
//
//   AnnotatedToken    → TokenRecord   (word case-folded,
//                                      comm_score looked up)
//   AnnotatedSentence → SentenceRecord
//   AnnotatedEntity   → EntityRecord  (text case-folded)
//
// A word missing from the frequency table keeps comm_score =
// None. It is not zero: "unknown" and "extremely common" are
// different things and the builders treat them differently.

use serde::{Deserialize, Serialize};

use crate::domain::{
    AnnotatedDocument, DocumentTables, EntityRecord, FeatureResult, FrequencyTable,
    SentenceRecord, TokenRecord,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Numerator of the commonality score
    pub freq_norm: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self { freq_norm: 1e5 }
    }
}

/// Project a document into token, sentence and entity tables.
///
/// Fails only when the annotation itself is malformed.
pub fn project_document(
    doc: &AnnotatedDocument,
    freq: Option<&FrequencyTable>,
    cfg: &ProjectionConfig,
) -> FeatureResult<DocumentTables> {
    doc.validate(None)?;

    let tokens = doc
        .tokens
        .iter()
        .map(|t| {
            let word = t.text.to_lowercase();
            let comm_score = freq.and_then(|f| f.commonality(&word, cfg.freq_norm));
            TokenRecord {
                word,
                lemma: t.lemma.clone(),
                length: t.length,
                pos: t.pos.clone(),
                tag: t.tag.clone(),
                alpha: t.is_alpha,
                stop: t.is_stop,
                punct: t.is_punct,
                vector: t.vector.clone(),
                comm_score,
            }
        })
        .collect();

    let sentences = doc
        .sentences
        .iter()
        .map(|s| SentenceRecord {
            length: s.n_tokens,
            noun_chunks: s.n_noun_chunks,
        })
        .collect();

    let entities = doc
        .entities
        .iter()
        .map(|e| EntityRecord {
            entity: e.text.to_lowercase(),
            n_words: e.n_words,
            length: e.length,
            label: e.label.clone(),
        })
        .collect();

    Ok(DocumentTables {
        id: doc.id.clone(),
        tokens,
        sentences,
        entities,
    })
}
