use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    config::MediaKind,
    engine::{
        ffmpeg::{self, filters, probe, runner},
        traits::{AudioSource, FfmpegCommand, MediaEngine, ProbeResult, RenderJob},
    },
    error::{RenderError, Result},
};

/// Two-stage backend: each item is rendered to its own normalized clip
/// (scaled, extended and captioned), then the clips are stacked and the
/// audio track attached in a final pass.
pub struct ClipEngine {
    scratch_root: Option<PathBuf>,
}

impl ClipEngine {
    pub fn new() -> Self {
        Self { scratch_root: None }
    }

    /// Keep intermediate clips under `root` instead of the system temp dir
    pub fn with_scratch_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            scratch_root: Some(root.into()),
        }
    }

    pub fn clip_path(scratch: &Path, index: usize) -> PathBuf {
        scratch.join(format!("clip_{:03}.mp4", index))
    }

    /// Per-item commands followed by the stacking command
    pub fn commands(&self, job: &RenderJob, scratch: &Path) -> Vec<FfmpegCommand> {
        let canvas = &job.layout.canvas;
        let mut commands = Vec::with_capacity(job.inputs.len() + 1);

        for (input, geometry) in job.inputs.iter().zip(&job.layout.items) {
            let mut args = ffmpeg::base_args();
            ffmpeg::push_input(&mut args, &input.path);

            let chain = filters::item_filters(geometry, canvas.fps, job.font_file.as_deref());
            args.push("-filter_complex".to_string());
            args.push(filters::labeled_chain("0:v", &chain, "clip"));
            args.push("-map".to_string());
            args.push("[clip]".to_string());
            args.push("-an".to_string());
            args.extend(ffmpeg::video_encode_args(&job.encode, canvas.fps));
            args.push("-t".to_string());
            args.push(filters::format_time(canvas.duration));
            args.push(Self::clip_path(scratch, geometry.index).to_string_lossy().to_string());

            commands.push(FfmpegCommand::ffmpeg(args));
        }

        let mut args = ffmpeg::base_args();
        let labels: Vec<String> = job
            .layout
            .items
            .iter()
            .enumerate()
            .map(|(position, geometry)| {
                ffmpeg::push_input(&mut args, &Self::clip_path(scratch, geometry.index));
                format!("{}:v", position)
            })
            .collect();

        // The stacking pass still reads audio from the original first item
        let audio_map = match &job.audio {
            AudioSource::FirstItem => {
                match job.inputs.first() {
                    Some(first) => {
                        ffmpeg::push_input(&mut args, &first.path);
                        format!("{}:a?", labels.len())
                    }
                    None => String::new(),
                }
            }
            AudioSource::Override(path) => {
                ffmpeg::push_input(&mut args, path);
                format!("{}:a:0", labels.len())
            }
        };

        args.push("-filter_complex".to_string());
        args.push(filters::hstack(&labels, "stacked"));
        args.push("-map".to_string());
        args.push("[stacked]".to_string());
        if !audio_map.is_empty() {
            args.push("-map".to_string());
            args.push(audio_map);
        }
        args.extend(ffmpeg::video_encode_args(&job.encode, canvas.fps));
        args.extend(ffmpeg::audio_encode_args(&job.encode));
        args.push("-t".to_string());
        args.push(filters::format_time(canvas.duration));
        args.push(job.output_path.to_string_lossy().to_string());
        commands.push(FfmpegCommand::ffmpeg(args));

        commands
    }
}

impl Default for ClipEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for ClipEngine {
    fn name(&self) -> &str {
        "clips"
    }

    fn description(&self) -> &str {
        "Render each item to its own clip, then stack the clips"
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
        self.commands(job, Path::new("<scratch>"))
    }

    fn render(&self, job: &RenderJob) -> Result<()> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("stack-compositor-");
        let scratch = match &self.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!("Intermediate clips in {}", scratch.path().display());

        let commands = self.commands(job, scratch.path());
        let total = commands.len();
        let duration = job.layout.canvas.duration;

        for (step, command) in commands.iter().enumerate() {
            if step + 1 < total {
                info!("   Rendering clip {}/{}", step + 1, total - 1);
            } else {
                info!("   Stacking {} clip(s)", total - 1);
            }
            runner::run(command, Some(duration))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::filter_graph::tests::job;

    #[test]
    fn test_one_command_per_item_plus_stack() {
        let engine = ClipEngine::new();
        let commands = engine.commands(&job(3, AudioSource::FirstItem), Path::new("/scratch"));
        assert_eq!(commands.len(), 4);

        for (i, command) in commands[..3].iter().enumerate() {
            assert_eq!(command.args.last().unwrap(), &format!("/scratch/clip_{:03}.mp4", i));
            assert!(command.args.contains(&"-an".to_string()));
            assert!(command.args.iter().any(|a| a.starts_with("[0:v]fps=25")));
        }

        let stack = &commands[3].args;
        assert_eq!(stack.last().unwrap(), "out.mp4");
        assert!(stack.contains(&"[0:v][1:v][2:v]hstack=inputs=3[stacked]".to_string()));
        // clips first, then the first item's file for its audio
        let inputs: Vec<&String> = stack
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| &w[1])
            .collect();
        assert_eq!(inputs.len(), 4);
        assert_eq!(inputs[3], "in0.mp4");
        assert!(stack.contains(&"3:a?".to_string()));
    }

    #[test]
    fn test_override_audio_in_stack_pass() {
        let engine = ClipEngine::new();
        let commands = engine.commands(
            &job(2, AudioSource::Override(PathBuf::from("voice.wav"))),
            Path::new("/scratch"),
        );

        let stack = &commands[2].args;
        assert!(stack.contains(&"voice.wav".to_string()));
        assert!(stack.contains(&"2:a:0".to_string()));
        assert!(!stack.contains(&"in0.mp4".to_string()));
    }

    #[test]
    fn test_plan_uses_placeholder_scratch() {
        let commands = ClipEngine::new().plan(&job(1, AudioSource::FirstItem));
        assert_eq!(commands.len(), 2);
        assert!(commands[0].args.last().unwrap().starts_with("<scratch>"));
    }
}
