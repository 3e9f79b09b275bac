//src/model/mod.rs
pub mod elements;
pub mod structure;

// Re-exports for cleaner imports
pub use elements::{get_atom_properties, get_atomic_number, Rgb};
pub use structure::{AtomicStructure, Cell, FrameSequence};
