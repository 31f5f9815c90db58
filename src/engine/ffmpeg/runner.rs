use std::collections::VecDeque;
use std::io::Read;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::engine::traits::FfmpegCommand;
use crate::error::RenderError;

/// Lines of stderr kept for error reports
const ERROR_TAIL_LINES: usize = 15;

pub fn check_ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run one ffmpeg invocation, logging progress against `total_duration`.
pub fn run(command: &FfmpegCommand, total_duration: Option<f64>) -> Result<(), RenderError> {
    debug!("Running: {}", command);

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            let reason = if e.kind() == std::io::ErrorKind::NotFound {
                format!(
                    "{} not found; please install FFmpeg: https://ffmpeg.org/download.html",
                    command.program
                )
            } else {
                format!("failed to spawn {}: {}", command.program, e)
            };
            RenderError::EncodeFailed { reason }
        })?;

    let mut tail = VecDeque::with_capacity(ERROR_TAIL_LINES);
    if let Some(stderr) = child.stderr.take() {
        follow_stderr(stderr, total_duration, &mut tail).map_err(|e| RenderError::EncodeFailed {
            reason: format!("failed to read {} output: {}", command.program, e),
        })?;
    }

    let status = child.wait().map_err(|e| RenderError::EncodeFailed {
        reason: format!("failed to wait for {}: {}", command.program, e),
    })?;

    if !status.success() {
        let details: Vec<String> = tail.into_iter().collect();
        return Err(RenderError::EncodeFailed {
            reason: format!(
                "{} exited with status {:?}: {}",
                command.program,
                status.code(),
                details.join("\n").trim()
            ),
        });
    }

    Ok(())
}

fn follow_stderr<R: Read>(
    mut stderr: R,
    total_duration: Option<f64>,
    tail: &mut VecDeque<String>,
) -> std::io::Result<()> {
    let mut buffer = [0u8; 4096];
    let mut pending = String::new();
    let mut last_reported = 0u32;

    loop {
        let read = stderr.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        pending.push_str(&String::from_utf8_lossy(&buffer[..read]));

        // ffmpeg ends progress lines with '\r'
        while let Some(pos) = pending.find(|c: char| c == '\r' || c == '\n') {
            let line: String = pending.drain(..=pos).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let (Some(total), Some(t)) = (total_duration, parse_progress_time(line)) {
                if total > 0.0 {
                    let percent = ((t / total) * 100.0).clamp(0.0, 100.0) as u32;
                    if percent >= last_reported + 10 {
                        last_reported = percent - percent % 10;
                        info!("   Encoding... {}%", last_reported);
                    }
                }
                continue;
            }

            if tail.len() == ERROR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }
    }

    Ok(())
}

/// Seconds from the `time=HH:MM:SS.ss` field of a progress line
pub fn parse_progress_time(line: &str) -> Option<f64> {
    let start = line.find("time=")? + "time=".len();
    let value = line[start..].split_whitespace().next()?;

    let mut seconds = 0.0;
    for part in value.split(':') {
        seconds = seconds * 60.0 + part.parse::<f64>().ok()?;
    }
    Some(seconds)
}
