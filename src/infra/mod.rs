// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Handles the file formats the pipeline writes:
//
//   schema_store.rs  → Assembly artifacts as JSON
//                      Saves the resolved column schema, the
//                      assembly config, the tensor and targets,
//                      and loads the schema back so inference
//                      sees exactly the training columns.
//
//   table_writer.rs  → CSV output
//                      Per-document feature tables and the
//                      per-example auxiliary tables.

/// Column schema and assembly artifact persistence
pub mod schema_store;

/// CSV writers for feature and auxiliary tables
pub mod table_writer;
