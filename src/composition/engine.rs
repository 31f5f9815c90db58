use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::{CompositeSpec, MediaKind, MediaSource},
    engine::{
        AudioSource, EncodeSettings, FfmpegCommand, MediaEngine, ProbeResult, RenderInput,
        RenderJob,
    },
    error::{CompositorError, ConfigError, RenderError, Result},
    fetch::RemoteAssetCache,
    layout::{compute_layout, LayoutSettings},
};

/// An item whose sources all point at local files
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub audio_override: Option<PathBuf>,
}

/// Summary of a finished render
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub fps: f64,
    pub item_count: usize,
}

/// Orchestrates the composite pipeline
///
/// The engine follows a clear pipeline:
/// 1. Source Resolution - Download remote links through the asset cache
/// 2. Probing - Read dimensions, frame rate and duration of every item
/// 3. Layout - Compute scaled sizes, offsets, extensions and text placement
/// 4. Render - Hand one job to the media engine and verify the output
pub struct CompositionEngine {
    engine: Arc<dyn MediaEngine>,
    cache: Option<Arc<RemoteAssetCache>>,
}

impl CompositionEngine {
    /// Create a new composition engine around a media backend
    pub fn new(engine: Box<dyn MediaEngine>) -> Self {
        Self::from_arc(Arc::from(engine))
    }

    pub fn from_arc(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            cache: None,
        }
    }

    /// Use an existing asset cache instead of opening one from the config
    pub fn with_asset_cache(mut self, cache: Arc<RemoteAssetCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn engine(&self) -> &dyn MediaEngine {
        self.engine.as_ref()
    }

    /// Run the full pipeline and produce the output file
    pub async fn run(&self, spec: &CompositeSpec) -> Result<RenderResult> {
        info!("🎬 Starting composite");
        info!("   Items: {}", spec.items.len());
        info!("   Output: {:?}", spec.output.path);
        info!("   Backend: {}", self.engine.name());

        // Missing tools surface as probe or encode failures below
        if !self.engine.is_available() {
            warn!("{} backend cannot find its tools; probing will likely fail", self.engine.name());
        }

        let job = self.prepare(spec).await?;
        self.render(job).await
    }

    /// Everything up to rendering; returns the job a backend would run
    pub async fn prepare(&self, spec: &CompositeSpec) -> Result<RenderJob> {
        let resolved = self.resolve_sources(spec).await?;
        let probes = self.probe_items(&resolved).await?;

        info!("📐 Step 3: Computing layout...");
        let layout = compute_layout(
            &probes,
            &spec.items,
            &LayoutSettings {
                style: &spec.text,
                fps: spec.output.fps,
                still_duration: spec.output.still_duration,
            },
        );
        info!(
            "   Canvas: {}x{}, {:.2}s @ {:.2} fps",
            layout.canvas.width, layout.canvas.height, layout.canvas.duration, layout.canvas.fps
        );
        for geometry in &layout.items {
            debug!(
                "   [{}] x={} {}x{} (scale {:.3}) extend {:.2}s",
                geometry.index + 1,
                geometry.x,
                geometry.width,
                geometry.height,
                geometry.scale,
                geometry.extend_by
            );
        }

        let audio = match resolved.first().and_then(|item| item.audio_override.clone()) {
            Some(path) => AudioSource::Override(path),
            None => AudioSource::FirstItem,
        };
        for (index, item) in resolved.iter().enumerate().skip(1) {
            if let Some(path) = &item.audio_override {
                warn!(
                    "Audio override {} on item {} is ignored; output audio comes from the first item",
                    path.display(),
                    index + 1
                );
            }
        }

        Ok(RenderJob {
            inputs: resolved
                .iter()
                .map(|item| RenderInput {
                    path: item.path.clone(),
                    kind: item.kind,
                })
                .collect(),
            layout,
            audio,
            encode: EncodeSettings {
                bitrate: spec.output.bitrate.clone(),
                audio_bitrate: spec.output.audio_bitrate.clone(),
                preset: spec.output.preset.clone(),
                threads: spec.output.threads,
                ..EncodeSettings::default()
            },
            font_file: spec.text.font_file.clone(),
            output_path: spec.output.path.clone(),
        })
    }

    /// The commands a render would run, without running them
    pub async fn plan(&self, spec: &CompositeSpec) -> Result<Vec<FfmpegCommand>> {
        let job = self.prepare(spec).await?;
        Ok(self.engine.plan(&job))
    }

    // ==========================================
    // PIPELINE STEP 1: SOURCE RESOLUTION
    // ==========================================

    async fn resolve_sources(&self, spec: &CompositeSpec) -> Result<Vec<ResolvedItem>> {
        info!("🔗 Step 1: Resolving sources...");

        let cache = if spec.has_remote_sources() {
            Some(match &self.cache {
                Some(cache) => cache.clone(),
                None => Arc::new(RemoteAssetCache::open(
                    &spec.cache.dir,
                    Duration::from_secs(spec.cache.ttl_secs),
                )?),
            })
        } else {
            None
        };

        let mut resolved = Vec::with_capacity(spec.items.len());
        for item in &spec.items {
            let path = resolve_source(&item.source, cache.as_deref(), item.kind.label()).await?;
            let audio_override = match &item.audio_override {
                Some(source) => Some(resolve_source(source, cache.as_deref(), "Audio").await?),
                None => None,
            };

            resolved.push(ResolvedItem {
                path,
                kind: item.kind,
                audio_override,
            });
        }

        Ok(resolved)
    }

    // ==========================================
    // PIPELINE STEP 2: PROBING
    // ==========================================

    async fn probe_items(&self, items: &[ResolvedItem]) -> Result<Vec<ProbeResult>> {
        info!("🔍 Step 2: Probing {} item(s)...", items.len());

        let engine = self.engine.clone();
        let targets: Vec<(PathBuf, MediaKind)> =
            items.iter().map(|item| (item.path.clone(), item.kind)).collect();

        let results = tokio::task::spawn_blocking(move || {
            targets
                .par_iter()
                .enumerate()
                .map(|(index, (path, kind))| {
                    engine
                        .probe(path, *kind)
                        .map_err(|e| probe_failure(index, path, e))
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| CompositorError::generic(format!("probe task failed: {}", e)))?;

        let probes = results.into_iter().collect::<Result<Vec<_>>>()?;

        for (index, (item, probe)) in items.iter().zip(&probes).enumerate() {
            info!(
                "   [{}] {}: {}x{}, {:.2}s, {:.1} fps, {} frames",
                index + 1,
                item.path.display(),
                probe.width,
                probe.height,
                probe.duration,
                probe.fps,
                probe.frame_count
            );
        }

        Ok(probes)
    }

    // ==========================================
    // PIPELINE STEP 4: RENDER
    // ==========================================

    async fn render(&self, job: RenderJob) -> Result<RenderResult> {
        info!("🎞️  Step 4: Rendering with {}...", self.engine.name());

        if let Some(parent) = job.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let engine = self.engine.clone();
        let job = Arc::new(job);
        let render_job = job.clone();
        tokio::task::spawn_blocking(move || engine.render(&render_job))
            .await
            .map_err(|e| RenderError::EncodeFailed {
                reason: format!("render task failed: {}", e),
            })?
            .map_err(|e| match e {
                CompositorError::Render(_) => e,
                other => RenderError::EncodeFailed {
                    reason: other.to_string(),
                }
                .into(),
            })?;

        if !job.output_path.exists() {
            return Err(RenderError::EncodeFailed {
                reason: format!("no output written to {}", job.output_path.display()),
            }
            .into());
        }

        let canvas = job.layout.canvas;
        info!("🎉 Composite saved to: {:?}", job.output_path);

        Ok(RenderResult {
            output_path: job.output_path.clone(),
            width: canvas.width,
            height: canvas.height,
            duration: canvas.duration,
            fps: canvas.fps,
            item_count: job.inputs.len(),
        })
    }
}

async fn resolve_source(
    source: &MediaSource,
    cache: Option<&RemoteAssetCache>,
    kind_label: &str,
) -> Result<PathBuf> {
    let path = match (source, cache) {
        (MediaSource::Local(path), _) => return Ok(path.clone()),
        (MediaSource::Remote(url), Some(cache)) => cache.resolve(url).await?,
        (MediaSource::Remote(url), None) => {
            return Err(CompositorError::generic(format!(
                "no asset cache available for {}",
                url
            )))
        }
    };

    if !path.is_file() {
        return Err(ConfigError::MissingMedia {
            kind: kind_label.to_string(),
            path: path.display().to_string(),
        }
        .into());
    }
    Ok(path)
}

/// Attach the item position to a backend probe error
fn probe_failure(index: usize, path: &std::path::Path, error: CompositorError) -> CompositorError {
    let reason = match error {
        CompositorError::Render(RenderError::ProbeFailed { reason, .. }) => reason,
        other => other.to_string(),
    };

    RenderError::ProbeFailed {
        index: index + 1,
        path: path.display().to_string(),
        reason,
    }
    .into()
}
