// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// This layer takes annotated documents all the way to stacked
// training tensors.
//
// The pipeline flows in this order:
//
//   annotated JSON
//       │
//       ▼
//   JsonCorpusLoader   → reads documents, frequency table, targets
//       │
//       ▼
//   project_document   → token / sentence / entity tables
//       │
//       ▼
//   normalize_tags     → raw tag → canonical tag lookup
//       │
//       ▼
//   (features layer)   → base rows, word-vector summaries, raw rows
//       │
//       ▼
//   assembler          → column alignment, filtering, resampling,
//                        noisy targets, (N, R, F, 1) tensor
//       │
//       ▼
//   TrainingDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   FeatureBatcher     → stacks examples into tensor batches
//
// Each module is responsible for exactly one step.

/// Reads annotated corpora, frequency tables and targets
pub mod loader;

/// Projects annotated documents into tables
pub mod projection;

/// Collapses fine-grained POS tags into canonical tags
pub mod tag_map;

/// Even upsampling and target upscaling
pub mod resample;

/// Builds the training tensor for a document collection
pub mod assembler;

/// Implements Burn's Dataset trait for assembled examples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
