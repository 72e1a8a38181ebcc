// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The seams between the pipeline and the outside world.
//
//   AnnotationSource → anything that yields annotated documents
//                      (a JSON Lines dump, a live annotation
//                      service client, an in-memory fixture)
//   Labeled          → any row carrying a regression target and
//                      its standard error, so target upscaling
//                      preserves whatever other columns the row has

use anyhow::Result;

use crate::domain::annotation::AnnotatedDocument;

// ─── AnnotationSource ─────────────────────────────────────────────────────────
/// Any component that can produce annotated documents.
///
/// Implementations:
///   - JsonCorpusLoader  → reads JSON Lines or a directory of JSON files
///   - Vec<AnnotatedDocument> → in-memory collections and tests
pub trait AnnotationSource {
    /// Load every available document, in collection order.
    fn load_all(&self) -> Result<Vec<AnnotatedDocument>>;
}

impl AnnotationSource for Vec<AnnotatedDocument> {
    fn load_all(&self) -> Result<Vec<AnnotatedDocument>> {
        Ok(self.clone())
    }
}

// ─── Labeled ──────────────────────────────────────────────────────────────────
/// A row with a document id, a regression target and the target's
/// standard error. `with_target` returns a copy of the row that differs
/// only in its target.
pub trait Labeled: Clone {
    fn id(&self) -> &str;
    fn target(&self) -> f64;
    fn standard_error(&self) -> f64;
    fn with_target(&self, target: f64) -> Self;
}
