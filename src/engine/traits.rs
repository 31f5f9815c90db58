use std::fmt;
use std::path::{Path, PathBuf};

use crate::{config::MediaKind, error::Result, layout::Layout};

/// Frame rate assumed when a source does not report one
pub const DEFAULT_FPS: f64 = 30.0;

/// Core trait every render backend implements
///
/// A backend owns both halves of the external toolkit contract: probing
/// intrinsic media properties and turning a [`RenderJob`] into an output
/// file.
pub trait MediaEngine: Send + Sync {
    /// Returns the unique name of this backend
    fn name(&self) -> &str;

    /// Returns a human-readable description of this backend
    fn description(&self) -> &str;

    /// Whether the external tools this backend drives can be found
    fn is_available(&self) -> bool {
        true
    }

    /// Read width, height, frame rate, duration and frame count
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<ProbeResult>;

    /// The commands `render` would run, without running them
    fn plan(&self, job: &RenderJob) -> Vec<FfmpegCommand>;

    /// Produce `job.output_path`. Blocks until encoding finishes.
    fn render(&self, job: &RenderJob) -> Result<()>;
}

/// Intrinsic properties of one media file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Seconds; zero for still images
    pub duration: f64,
    pub frame_count: u64,
}

/// One resolved, probed item handed to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInput {
    pub path: PathBuf,
    pub kind: MediaKind,
}

/// Where the output's single audio stream comes from
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// The first item's own audio stream, if it has one
    FirstItem,
    /// The first item's audio override file
    Override(PathBuf),
}

/// Encoder parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub bitrate: String,
    pub audio_bitrate: String,
    pub preset: String,
    pub threads: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            bitrate: "15000k".to_string(),
            audio_bitrate: "192k".to_string(),
            preset: "ultrafast".to_string(),
            threads: 4,
        }
    }
}

/// Everything a backend needs to produce the composite
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Parallel to `layout.items`
    pub inputs: Vec<RenderInput>,
    pub layout: Layout,
    pub audio: AudioSource,
    pub encode: EncodeSettings,
    pub font_file: Option<PathBuf>,
    pub output_path: PathBuf,
}

/// A program invocation: program name plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl FfmpegCommand {
    pub fn ffmpeg(args: Vec<String>) -> Self {
        Self {
            program: "ffmpeg".to_string(),
            args,
        }
    }
}

impl fmt::Display for FfmpegCommand {
    /// Shell-quoted, suitable for copy and paste
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            let plain = !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,".contains(c));
            if plain {
                write!(f, " {}", arg)?;
            } else {
                write!(f, " '{}'", arg.replace('\'', "'\\''"))?;
            }
        }
        Ok(())
    }
}
