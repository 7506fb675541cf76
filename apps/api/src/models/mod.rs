pub mod document;

pub use document::{Document, ExtractionFailure, NormalizedDocument};
