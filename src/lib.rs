//! Feature engineering for readability-style regression over short text
//! excerpts.
//!
//! Annotated documents (tokens, sentences, entities and embeddings from an
//! external NLP service) are turned into either one scalar feature row per
//! document or a fixed-shape `(example, row, feature, 1)` training tensor
//! with noisy per-replicate targets.
//!
//! Layers, top to bottom:
//!
//! * [`application`]: whole-collection workflows
//! * [`domain`]: annotation contract, tables, errors, traits
//! * [`data`]: loaders, projection, tag normalisation, resampling,
//!   tensor assembly, burn dataset and batcher
//! * [`features`]: scalar, word-vector and per-token feature builders
//! * [`infra`]: artifact and CSV persistence

pub mod application;
pub mod data;
pub mod domain;
pub mod features;
pub mod infra;
