// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the shape-drawing
// classification problem.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Think of this layer as the "dictionary" of the system:
// it defines what things ARE, not how they work.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The fixed set of shape categories (the label space)
pub mod category;

// Raw bitmap arrays and the keys that point into them
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;
