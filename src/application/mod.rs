// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// This layer orchestrates the other layers over a whole
// document collection.
//
// Rules for this layer:
//   - No feature math here (that's Layer 4b)
//   - No printing here (that's Layer 1)
//   - File formats live in Layer 4 (inputs) and 6 (outputs)
//   - Only workflow coordination

// Scalar feature table per document
pub mod feature_use_case;

// Training tensor assembly and artifact persistence
pub mod assemble_use_case;
