// ============================================================
// Layer 3: Annotation Contract
// ============================================================
// The shape of what the external NLP annotation service hands
// back for one excerpt. Tokenisation, tagging, lemmatisation,
// entity recognition and embedding lookup all happen outside
// this crate; by the time an AnnotatedDocument exists, every
// linguistic decision has already been made.
//
//   AnnotatedDocument
//     ├── tokens:    Vec<AnnotatedToken>     (surface order)
//     ├── sentences: Vec<AnnotatedSentence>
//     └── entities:  Vec<AnnotatedEntity>
//
// Every token carries an embedding vector of the same fixed
// dimensionality D. validate() enforces that before anything
// downstream indexes into the vectors.

use serde::{Deserialize, Serialize};

use crate::domain::error::{FeatureError, FeatureResult};

/// One annotated token as produced by the annotation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedToken {
    /// Surface text exactly as it appears in the excerpt
    pub text: String,

    pub lemma: String,

    /// Coarse part-of-speech tag (e.g. "NOUN")
    pub pos: String,

    /// Fine-grained tag (e.g. "NNS", "PRP$")
    pub tag: String,

    pub is_alpha: bool,
    pub is_stop: bool,
    pub is_punct: bool,

    /// Character length of the token
    pub length: usize,

    /// Word embedding of dimensionality D
    pub vector: Vec<f32>,
}

/// Per-sentence counts reported by the annotation service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    pub n_tokens: usize,
    pub n_noun_chunks: usize,
}

/// A named entity span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedEntity {
    pub text: String,

    /// Entity type label (e.g. "PERSON", "GPE")
    pub label: String,

    /// Number of tokens covered by the entity
    pub n_words: usize,

    /// Character length of the entity text
    pub length: usize,
}

/// A fully annotated excerpt, keyed by its document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub id: String,
    pub tokens: Vec<AnnotatedToken>,
    pub sentences: Vec<AnnotatedSentence>,
    #[serde(default)]
    pub entities: Vec<AnnotatedEntity>,
}

impl AnnotatedDocument {
    /// Embedding dimensionality of this document, taken from its first token.
    /// None for a document without tokens.
    pub fn embedding_dim(&self) -> Option<usize> {
        self.tokens.first().map(|t| t.vector.len())
    }

    /// Check the structural guarantees the rest of the pipeline relies on.
    ///
    /// `expected_dim` pins the embedding dimensionality when the caller
    /// knows it; otherwise all tokens only have to agree with each other.
    pub fn validate(&self, expected_dim: Option<usize>) -> FeatureResult<()> {
        if self.id.trim().is_empty() {
            return Err(self.malformed("document id is empty"));
        }

        if !self.tokens.is_empty() && self.sentences.is_empty() {
            return Err(self.malformed("tokens present but no sentences"));
        }

        let dim = match (expected_dim, self.embedding_dim()) {
            (Some(d), _) => d,
            (None, Some(d)) => d,
            (None, None) => return Ok(()),
        };

        for (i, token) in self.tokens.iter().enumerate() {
            if token.text.is_empty() {
                return Err(self.malformed(format!("token {i} has empty text")));
            }
            if token.vector.len() != dim {
                return Err(self.malformed(format!(
                    "token {i} ('{}') has a {}-dimensional vector, expected {dim}",
                    token.text,
                    token.vector.len()
                )));
            }
        }

        Ok(())
    }

    fn malformed(&self, reason: impl Into<String>) -> FeatureError {
        FeatureError::MalformedAnnotation {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, dim: usize) -> AnnotatedToken {
        AnnotatedToken {
            text: text.to_string(),
            lemma: text.to_lowercase(),
            pos: "NOUN".to_string(),
            tag: "NN".to_string(),
            is_alpha: true,
            is_stop: false,
            is_punct: false,
            length: text.chars().count(),
            vector: vec![0.5; dim],
        }
    }

    fn doc(tokens: Vec<AnnotatedToken>) -> AnnotatedDocument {
        AnnotatedDocument {
            id: "doc-1".to_string(),
            tokens,
            sentences: vec![AnnotatedSentence { n_tokens: 2, n_noun_chunks: 1 }],
            entities: Vec::new(),
        }
    }

    #[test]
    fn test_valid_document_passes() {
        let d = doc(vec![token("River", 4), token("banks", 4)]);
        assert!(d.validate(None).is_ok());
        assert!(d.validate(Some(4)).is_ok());
        assert_eq!(d.embedding_dim(), Some(4));
    }

    #[test]
    fn test_inconsistent_vectors_rejected() {
        let d = doc(vec![token("River", 4), token("banks", 3)]);
        let err = d.validate(None).unwrap_err();
        assert!(matches!(err, FeatureError::MalformedAnnotation { .. }));
    }

    #[test]
    fn test_expected_dim_enforced() {
        let d = doc(vec![token("River", 4)]);
        assert!(d.validate(Some(96)).is_err());
    }

    #[test]
    fn test_tokens_without_sentences_rejected() {
        let mut d = doc(vec![token("River", 4)]);
        d.sentences.clear();
        assert!(d.validate(None).is_err());
    }

    #[test]
    fn test_entities_default_when_missing_from_json() {
        let json = r#"{"id":"a","tokens":[],"sentences":[]}"#;
        let d: AnnotatedDocument = serde_json::from_str(json).unwrap();
        assert!(d.entities.is_empty());
        assert!(d.validate(None).is_ok());
    }
}
