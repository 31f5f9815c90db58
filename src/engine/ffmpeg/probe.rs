use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::config::MediaKind;
use crate::engine::traits::{ProbeResult, DEFAULT_FPS};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a file. Stills are read with the `image` crate, everything else
/// with ffprobe.
pub fn probe(path: &Path, kind: MediaKind) -> Result<ProbeResult, String> {
    match kind {
        MediaKind::Image => probe_image(path).or_else(|e| {
            debug!("image header read failed for {}: {}, trying ffprobe", path.display(), e);
            probe_with_ffprobe(path).map(|p| ProbeResult {
                duration: 0.0,
                frame_count: 1,
                ..p
            })
        }),
        MediaKind::Video => probe_with_ffprobe(path),
    }
}

/// A still is a single frame with no duration of its own
pub fn probe_image(path: &Path) -> Result<ProbeResult, String> {
    let (width, height) = image::image_dimensions(path).map_err(|e| e.to_string())?;
    Ok(ProbeResult {
        width,
        height,
        fps: DEFAULT_FPS,
        duration: 0.0,
        frame_count: 1,
    })
}

pub fn probe_with_ffprobe(path: &Path) -> Result<ProbeResult, String> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                "ffprobe not found; please install FFmpeg".to_string()
            } else {
                format!("failed to run ffprobe: {}", e)
            }
        })?;

    if !output.status.success() {
        return Err(format!(
            "ffprobe exited with status {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let json = String::from_utf8(output.stdout).map_err(|_| "ffprobe returned non-UTF8 output".to_string())?;
    parse_probe_output(&json)
}

/// Interpret ffprobe's JSON for the first video stream
pub fn parse_probe_output(json: &str) -> Result<ProbeResult, String> {
    let parsed: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| format!("invalid ffprobe output: {}", e))?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| "no video stream found".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no dimensions".to_string()),
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .unwrap_or(DEFAULT_FPS);

    let duration = stream
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            parsed
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|d| d.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (duration * fps).round() as u64);

    Ok(ProbeResult {
        width,
        height,
        fps,
        duration,
        frame_count,
    })
}

/// "30000/1001" -> 29.97; a zero denominator yields `None`
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((num, den)) => (num.trim().parse::<f64>().ok()?, den.trim().parse::<f64>().ok()?),
        None => (rate.trim().parse::<f64>().ok()?, 1.0),
    };

    if den == 0.0 || num <= 0.0 {
        None
    } else {
        Some(num / den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "audio", "duration": "12.000000"},
            {"codec_type": "video", "width": 1920, "height": 1080,
             "r_frame_rate": "30000/1001", "duration": "10.010000", "nb_frames": "300"}
        ],
        "format": {"duration": "12.000000"}
    }"#;

    #[test]
    fn test_parse_prefers_video_stream_values() {
        let probe = parse_probe_output(SAMPLE).unwrap();
        assert_eq!((probe.width, probe.height), (1920, 1080));
        assert!((probe.fps - 29.97).abs() < 0.01);
        assert_eq!(probe.duration, 10.01);
        assert_eq!(probe.frame_count, 300);
    }

    #[test]
    fn test_parse_falls_back_to_container_duration() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 480, "r_frame_rate": "25/1"}],
            "format": {"duration": "4.0"}
        }"#;

        let probe = parse_probe_output(json).unwrap();
        assert_eq!(probe.duration, 4.0);
        assert_eq!(probe.fps, 25.0);
        assert_eq!(probe.frame_count, 100);
    }

    #[test]
    fn test_parse_rejects_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio"}]}"#;
        assert!(parse_probe_output(json).unwrap_err().contains("no video stream"));
    }

    #[test]
    fn test_frame_rate_parsing() {
        assert_eq!(parse_frame_rate("24/1"), Some(24.0));
        assert_eq!(parse_frame_rate("60"), Some(60.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("30/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_probe_image_reads_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        image::RgbImage::new(64, 48).save(&path).unwrap();

        let probe = probe(&path, MediaKind::Image).unwrap();
        assert_eq!((probe.width, probe.height), (64, 48));
        assert_eq!(probe.duration, 0.0);
        assert_eq!(probe.frame_count, 1);
    }
}
