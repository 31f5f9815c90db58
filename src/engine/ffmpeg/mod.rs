//! Helpers shared by the FFmpeg-driven backends: probing, filter
//! fragments, encoder arguments and the process runner.

pub mod filters;
pub mod probe;
pub mod runner;

use std::path::Path;

use crate::engine::traits::EncodeSettings;

/// Leading arguments of every invocation
pub fn base_args() -> Vec<String> {
    vec!["-y".to_string(), "-hide_banner".to_string()]
}

pub fn push_input(args: &mut Vec<String>, path: &Path) {
    args.push("-i".to_string());
    args.push(path.to_string_lossy().to_string());
}

/// Video encoder arguments, including the output frame rate
pub fn video_encode_args(encode: &EncodeSettings, fps: f64) -> Vec<String> {
    vec![
        "-r".to_string(),
        fps.to_string(),
        "-c:v".to_string(),
        encode.video_codec.clone(),
        "-preset".to_string(),
        encode.preset.clone(),
        "-b:v".to_string(),
        encode.bitrate.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-threads".to_string(),
        encode.threads.to_string(),
    ]
}

pub fn audio_encode_args(encode: &EncodeSettings) -> Vec<String> {
    vec![
        "-c:a".to_string(),
        encode.audio_codec.clone(),
        "-b:a".to_string(),
        encode.audio_bitrate.clone(),
    ]
}
