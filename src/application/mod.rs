// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each
// (training, classifying a picture, re-exporting the model).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Single-picture inference from the latest checkpoint
pub mod classify_use_case;

// ONNX re-export from the latest checkpoint
pub mod export_use_case;
