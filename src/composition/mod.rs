//! # Composition Engine
//!
//! The composition engine sequences source resolution, probing, layout and
//! rendering to create the side-by-side composite.

pub mod engine;

// Re-exports for convenience
pub use engine::{CompositionEngine, RenderResult, ResolvedItem};
