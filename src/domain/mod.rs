// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// pipeline works on. No burn types, no file I/O here.
//
//   annotation.rs → the contract of the external annotation service
//   tables.rs     → projected token / sentence / entity records,
//                   frequency table, target records
//   error.rs      → FeatureError, the typed failure kinds
//   traits.rs     → AnnotationSource and Labeled

pub mod annotation;

pub mod tables;

pub mod error;

pub mod traits;

pub use annotation::{AnnotatedDocument, AnnotatedEntity, AnnotatedSentence, AnnotatedToken};
pub use error::{FeatureError, FeatureResult};
pub use tables::{DocumentTables, EntityRecord, FrequencyTable, SentenceRecord, TargetRecord, TokenRecord};
pub use traits::{AnnotationSource, Labeled};
