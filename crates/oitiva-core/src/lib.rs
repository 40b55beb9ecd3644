//! oitiva-core - shared types for testimony analysis
//!
//! Holds the fixed-shape [`AnalysisResult`] returned to the UI layer and the
//! lenient deserializers that let it absorb partial model output.

pub mod lenient;
pub mod types;

pub use types::*;
