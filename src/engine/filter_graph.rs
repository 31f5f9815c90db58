use std::path::Path;

use tracing::info;

use crate::{
    config::MediaKind,
    engine::{
        ffmpeg::{self, filters, probe, runner},
        traits::{AudioSource, FfmpegCommand, MediaEngine, ProbeResult, RenderJob},
    },
    error::{RenderError, Result},
};

const STACKED_LABEL: &str = "stacked";

/// Single-pass backend: every input, per-item chain and the stack go into
/// one `-filter_complex` graph.
pub struct FilterGraphEngine;

impl FilterGraphEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build the full ffmpeg invocation for a job
    pub fn command(&self, job: &RenderJob) -> FfmpegCommand {
        let canvas = &job.layout.canvas;
        let mut args = ffmpeg::base_args();

        for input in &job.inputs {
            ffmpeg::push_input(&mut args, &input.path);
        }

        let audio_map = match &job.audio {
            AudioSource::FirstItem => "0:a?".to_string(),
            AudioSource::Override(path) => {
                ffmpeg::push_input(&mut args, path);
                format!("{}:a:0", job.inputs.len())
            }
        };

        let mut graph = Vec::with_capacity(job.layout.items.len() + 1);
        let mut labels = Vec::with_capacity(job.layout.items.len());
        for geometry in &job.layout.items {
            let label = format!("v{}", geometry.index);
            let chain = filters::item_filters(geometry, canvas.fps, job.font_file.as_deref());
            graph.push(filters::labeled_chain(
                &format!("{}:v", geometry.index),
                &chain,
                &label,
            ));
            labels.push(label);
        }
        graph.push(filters::hstack(&labels, STACKED_LABEL));

        args.push("-filter_complex".to_string());
        args.push(graph.join(";"));
        args.push("-map".to_string());
        args.push(format!("[{}]", STACKED_LABEL));
        args.push("-map".to_string());
        args.push(audio_map);

        args.extend(ffmpeg::video_encode_args(&job.encode, canvas.fps));
        args.extend(ffmpeg::audio_encode_args(&job.encode));
        args.push("-t".to_string());
        args.push(filters::format_time(canvas.duration));
        args.push(job.output_path.to_string_lossy().to_string());

        FfmpegCommand::ffmpeg(args)
    }
}

impl Default for FilterGraphEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for FilterGraphEngine {
    fn name(&self) -> &str {
        "filtergraph"
    }

    fn description(&self) -> &str {
        "One FFmpeg pass with a single filter graph"
    }

    fn is_available(&self) -> bool {
        runner::check_ffmpeg_available()
    }

    fn probe(&self, path: &Path, kind: MediaKind) -> Result<ProbeResult> {
        probe::probe(path, kind).map_err(|reason| {
            RenderError::ProbeFailed {
                index: 0,
                path: path.display().to_string(),
                reason,
            }
            .into()
        })
    }

    fn plan(&self, job: &RenderJob) -> Vec<FfmpegCommand> {
        vec![self.command(job)]
    }

    fn render(&self, job: &RenderJob) -> Result<()> {
        info!(
            "Encoding {}x{} composite of {} item(s)",
            job.layout.canvas.width,
            job.layout.canvas.height,
            job.inputs.len()
        );
        runner::run(&self.command(job), Some(job.layout.canvas.duration))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::TextStyle;
    use crate::engine::traits::{EncodeSettings, RenderInput};
    use crate::layout::{compute_layout, LayoutSettings};
    use crate::config::{MediaItem, MediaSource};
    use std::path::PathBuf;

    pub(crate) fn job(count: usize, audio: AudioSource) -> RenderJob {
        let style = TextStyle::default();
        let probes: Vec<ProbeResult> = (0..count)
            .map(|i| ProbeResult {
                width: 640,
                height: 360 + 120 * i as u32,
                fps: 25.0,
                duration: 4.0 + i as f64,
                frame_count: 100,
            })
            .collect();
        let items: Vec<MediaItem> = (0..count)
            .map(|i| MediaItem {
                source: MediaSource::Local(PathBuf::from(format!("in{i}.mp4"))),
                kind: MediaKind::Video,
                heading: Some(format!("Item {i}")),
                subheading: None,
                audio_override: None,
                frame_count_override: None,
            })
            .collect();
        let layout = compute_layout(
            &probes,
            &items,
            &LayoutSettings {
                style: &style,
                fps: None,
                still_duration: 5.0,
            },
        );

        RenderJob {
            inputs: (0..count)
                .map(|i| RenderInput {
                    path: PathBuf::from(format!("in{i}.mp4")),
                    kind: MediaKind::Video,
                })
                .collect(),
            layout,
            audio,
            encode: EncodeSettings::default(),
            font_file: None,
            output_path: PathBuf::from("out.mp4"),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
        args.windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].as_str())
            .collect()
    }

    #[test]
    fn test_command_shape() {
        let command = FilterGraphEngine::new().command(&job(2, AudioSource::FirstItem));
        let args = &command.args;

        assert_eq!(command.program, "ffmpeg");
        assert_eq!(args.last().unwrap(), "out.mp4");
        assert_eq!(value_after(args, "-i"), vec!["in0.mp4", "in1.mp4"]);
        assert_eq!(value_after(args, "-map"), vec!["[stacked]", "0:a?"]);
        assert_eq!(value_after(args, "-r"), vec!["25"]);
        assert_eq!(value_after(args, "-c:v"), vec!["libx264"]);
        assert_eq!(value_after(args, "-c:a"), vec!["aac"]);
        assert_eq!(value_after(args, "-t"), vec!["5.000000"]);

        let graph = value_after(args, "-filter_complex")[0];
        assert!(graph.starts_with("[0:v]fps=25,scale="));
        assert!(graph.contains("[1:v]fps=25,scale="));
        assert!(graph.ends_with("[v0][v1]hstack=inputs=2[stacked]"));
        // only the shorter item is padded
        assert_eq!(graph.matches("tpad=").count(), 1);
    }

    #[test]
    fn test_audio_override_becomes_extra_input() {
        let command = FilterGraphEngine::new().command(&job(
            2,
            AudioSource::Override(PathBuf::from("voice.mp3")),
        ));

        assert_eq!(
            value_after(&command.args, "-i"),
            vec!["in0.mp4", "in1.mp4", "voice.mp3"]
        );
        assert_eq!(value_after(&command.args, "-map"), vec!["[stacked]", "2:a:0"]);
    }

    #[test]
    fn test_single_item_passes_through() {
        let command = FilterGraphEngine::new().command(&job(1, AudioSource::FirstItem));
        let graph = value_after(&command.args, "-filter_complex")[0];
        assert!(graph.ends_with("[v0]null[stacked]"));
        assert!(!graph.contains("hstack"));
    }
}
