use std::path::Path;

use stack_compositor::{
    composition::CompositionEngine,
    config::{CompositeSpec, MediaKind},
    engine::{FfmpegCommand, FilterGraphEngine, MediaEngine, ProbeResult, RenderJob},
    error::{CompositorError, ConfigError},
    Result,
};
use tempfile::tempdir;

/// Reads "WIDTHxHEIGHTxSECONDS" from each input file and writes a marker
/// file instead of encoding
struct FakeEngine;

impl MediaEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn description(&self) -> &str {
        "Dimensions come from the file contents"
    }

    fn probe(&self, path: &Path, kind: MediaKind) -> Result<ProbeResult> {
        let text = std::fs::read_to_string(path)?;
        let parts: Vec<f64> = text
            .trim()
            .split('x')
            .map(|p| p.parse().map_err(|_| CompositorError::generic("bad fixture")))
            .collect::<Result<_>>()?;

        let duration = if kind == MediaKind::Image { 0.0 } else { parts[2] };
        Ok(ProbeResult {
            width: parts[0] as u32,
            height: parts[1] as u32,
            fps: 25.0,
            duration,
            frame_count: (duration * 25.0).round().max(1.0) as u64,
        })
    }

    fn plan(&self, job: &RenderJob) -> Vec<FfmpegCommand> {
        FilterGraphEngine::new().plan(job)
    }

    fn render(&self, job: &RenderJob) -> Result<()> {
        std::fs::write(&job.output_path, format!("{} inputs", job.inputs.len()))?;
        Ok(())
    }
}

fn write_config(dir: &Path, items: &[(&str, &str)]) -> std::path::PathBuf {
    let mut toml = format!(
        "[output]\npath = {:?}\n\n",
        dir.join("composite.mp4").display().to_string()
    );
    for (name, heading) in items {
        toml.push_str(&format!(
            "[[videos]]\npath = {:?}\nheading = {:?}\n\n",
            dir.join(name).display().to_string(),
            heading
        ));
    }

    let path = dir.join("composite.toml");
    std::fs::write(&path, toml).unwrap();
    path
}

#[tokio::test]
async fn two_items_render_side_by_side() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("wide.mp4"), "1920x1080x6").unwrap();
    std::fs::write(dir.path().join("tall.mp4"), "720x1280x4").unwrap();
    let config = write_config(dir.path(), &[("wide.mp4", "Wide"), ("tall.mp4", "Tall")]);

    let spec = CompositeSpec::load(&config).unwrap();
    let result = CompositionEngine::new(Box::new(FakeEngine))
        .run(&spec)
        .await
        .unwrap();

    // Both scaled to the tallest height of 1280
    let wide_scaled = (1920.0_f64 * 1280.0 / 1080.0).floor() as u32 / 2 * 2;
    assert_eq!(result.height, 1280);
    assert_eq!(result.width, wide_scaled + 720);
    assert_eq!(result.duration, 6.0);
    assert_eq!(result.fps, 25.0);
    assert_eq!(result.item_count, 2);
    assert!(result.output_path.exists());
}

#[tokio::test]
async fn missing_input_fails_before_render() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("present.mp4"), "640x480x2").unwrap();
    let config = write_config(
        dir.path(),
        &[("present.mp4", "Here"), ("absent.mp4", "Gone")],
    );

    let err = CompositeSpec::load(&config).unwrap_err();
    match err {
        CompositorError::Config(ConfigError::MissingMedia { path, .. }) => {
            assert!(path.ends_with("absent.mp4"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("composite.mp4").exists());
}

#[tokio::test]
async fn dry_run_plans_one_stacked_command() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.mp4"), "640x480x3").unwrap();
    std::fs::write(dir.path().join("b.png"), "300x600x0").unwrap();
    let config = write_config(dir.path(), &[("a.mp4", "Clip"), ("b.png", "Still")]);

    let spec = CompositeSpec::load(&config).unwrap();
    let commands = CompositionEngine::new(Box::new(FakeEngine))
        .plan(&spec)
        .await
        .unwrap();

    assert_eq!(commands.len(), 1);
    let graph = commands[0]
        .args
        .iter()
        .find(|a| a.contains("hstack"))
        .expect("filter graph");
    assert!(graph.contains("hstack=inputs=2"));
    assert!(!dir.path().join("composite.mp4").exists());
}
