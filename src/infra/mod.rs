// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that writes to or reads from disk on behalf of the
// other layers:
//
//   checkpoint.rs — model weights per epoch (Burn recorder)
//                   plus TrainConfig as JSON, so inference can
//                   rebuild the network
//
//   metrics.rs    — epoch-level loss / accuracy / lr CSV
//
//   protobuf.rs   — minimal protobuf wire-format codec
//
//   onnx.rs       — ONNX graph export of a trained ShapeCnn
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Protobuf encoder/decoder used by the ONNX exporter
pub mod protobuf;

/// ONNX inference-graph exporter
pub mod onnx;
