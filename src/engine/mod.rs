//! # Media Engine
//!
//! The external toolkit boundary. A [`MediaEngine`] probes media files and
//! renders a [`RenderJob`]; the two built-in backends drive FFmpeg in
//! different ways and are picked by name from the [`EngineRegistry`].

pub mod clips;
pub mod ffmpeg;
pub mod filter_graph;
pub mod registry;
pub mod traits;

pub use clips::ClipEngine;
pub use filter_graph::FilterGraphEngine;
pub use registry::{EngineRegistry, DEFAULT_ENGINE};
pub use traits::{
    AudioSource, EncodeSettings, FfmpegCommand, MediaEngine, ProbeResult, RenderInput, RenderJob,
    DEFAULT_FPS,
};
