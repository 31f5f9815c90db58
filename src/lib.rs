//! # Stack-Compositor
//!
//! Place several videos and still images side by side in one output video,
//! each captioned with an optional heading and subheading.
//!
//! A TOML file lists the items left to right. Every item is scaled to a
//! common height, shorter items hold their last frame until the longest one
//! ends, and the output audio comes from the first item. Items may be local
//! paths or shareable drive links; links are downloaded once into a local
//! cache and reused while fresh.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stack_compositor::{
//!     composition::CompositionEngine,
//!     config::CompositeSpec,
//!     engine::EngineRegistry,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let spec = CompositeSpec::load("composite.toml")?;
//! let registry = EngineRegistry::new();
//! let backend = registry.get_engine("filtergraph").unwrap();
//!
//! let engine = CompositionEngine::new(backend);
//! let result = engine.run(&spec).await?;
//! println!("{}x{} -> {:?}", result.width, result.height, result.output_path);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading and validation
//! - [`fetch`] - Remote asset cache for drive links
//! - [`layout`] - Pure geometry and timing computation
//! - [`engine`] - Media engine trait and the FFmpeg backends
//! - [`composition`] - Pipeline orchestration
//!
//! ## Custom Backends
//!
//! Implement [`MediaEngine`](engine::MediaEngine) and register it by name:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stack_compositor::config::MediaKind;
//! use stack_compositor::engine::{EngineRegistry, FfmpegCommand, MediaEngine, ProbeResult, RenderJob};
//! use stack_compositor::Result;
//!
//! struct DryEngine;
//!
//! impl MediaEngine for DryEngine {
//!     fn name(&self) -> &str { "dry" }
//!     fn description(&self) -> &str { "Plans but never renders" }
//!     fn probe(&self, _path: &Path, _kind: MediaKind) -> Result<ProbeResult> {
//!         Ok(ProbeResult { width: 640, height: 480, fps: 30.0, duration: 1.0, frame_count: 30 })
//!     }
//!     fn plan(&self, _job: &RenderJob) -> Vec<FfmpegCommand> { Vec::new() }
//!     fn render(&self, _job: &RenderJob) -> Result<()> { Ok(()) }
//! }
//!
//! let mut registry = EngineRegistry::new();
//! registry.register("dry".to_string(), || Box::new(DryEngine));
//! ```

pub mod composition;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod layout;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{CompositionEngine, RenderResult},
    config::CompositeSpec,
    engine::{EngineRegistry, MediaEngine},
    error::{CompositorError, Result},
    fetch::RemoteAssetCache,
};
