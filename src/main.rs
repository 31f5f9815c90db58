use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stack_compositor::{
    composition::CompositionEngine,
    config::{self, CacheSettings, CompositeSpec},
    engine::{EngineRegistry, DEFAULT_ENGINE},
    error::{CompositorError, RenderError},
    fetch::RemoteAssetCache,
};

const EXAMPLE_CONFIG_PATH: &str = "example_config.toml";

#[derive(Parser)]
#[command(
    name = "stack-compositor",
    version,
    about = "Composite videos and images side by side with headings",
    long_about = "Stack-Compositor scales every item to a common height, places them left to right, draws a heading and subheading over each one, and encodes a single video with the first item's audio."
)]
struct Cli {
    /// Config file, or a directory `foo/` whose config is the sibling `foo.toml`
    input: Option<PathBuf>,

    /// Render backend (filtergraph, clips)
    #[arg(short, long, default_value = DEFAULT_ENGINE)]
    backend: String,

    /// Print the ffmpeg commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Override the download cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override the download cache freshness window in seconds
    #[arg(long)]
    cache_ttl: Option<u64>,

    /// Remove cached downloads at least SECS old (all of them when omitted),
    /// written as `--clear-cache` or `--clear-cache=SECS`
    #[arg(long, value_name = "SECS", num_args = 0..=1, require_equals = true)]
    clear_cache: Option<Option<u64>>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.input.is_none() && cli.clear_cache.is_none() {
        config::write_example(EXAMPLE_CONFIG_PATH)
            .with_context(|| format!("Failed to write {}", EXAMPLE_CONFIG_PATH))?;
        println!("Created example configuration: {}", EXAMPLE_CONFIG_PATH);
        println!();
        println!("Usage: stack-compositor <config.toml | directory>");
        println!("Edit the example with your media paths, then run it again with that file.");
        return Ok(());
    }

    info!("Starting Stack-Compositor v{}", env!("CARGO_PKG_VERSION"));

    let spec = match &cli.input {
        Some(input) => Some(load_spec(input, &cli)?),
        None => None,
    };

    if let Some(older_than) = cli.clear_cache {
        let settings = cache_settings(spec.as_ref(), &cli);
        clear_cache(&settings, older_than).context("Failed to clear the download cache")?;
    }

    let Some(spec) = spec else {
        return Ok(());
    };

    // Initialize backend registry and get the requested backend
    let registry = EngineRegistry::new();
    let backend = registry
        .get_engine(&cli.backend)
        .ok_or_else(|| RenderError::UnknownBackend {
            name: cli.backend.clone(),
        })
        .map_err(CompositorError::from)?;
    info!("Using {} backend: {}", backend.name(), backend.description());

    let engine = CompositionEngine::new(backend);

    if cli.dry_run {
        for command in engine.plan(&spec).await? {
            println!("{}", command);
        }
        return Ok(());
    }

    let result = engine.run(&spec).await?;
    println!(
        "Composite complete: {} ({}x{}, {:.2}s @ {:.2} fps, {} item(s))",
        result.output_path.display(),
        result.width,
        result.height,
        result.duration,
        result.fps,
        result.item_count
    );

    Ok(())
}

fn load_spec(input: &Path, cli: &Cli) -> stack_compositor::Result<CompositeSpec> {
    let config_path = config::resolve_config_path(input)?;
    info!("Loading configuration from {:?}", config_path);

    let mut spec = CompositeSpec::load(&config_path)?;
    spec.cache = cache_settings(Some(&spec), cli);
    Ok(spec)
}

fn cache_settings(spec: Option<&CompositeSpec>, cli: &Cli) -> CacheSettings {
    let mut settings = spec.map(|s| s.cache.clone()).unwrap_or_default();
    if let Some(dir) = &cli.cache_dir {
        settings.dir = dir.clone();
    }
    if let Some(ttl) = cli.cache_ttl {
        settings.ttl_secs = ttl;
    }
    settings
}

fn clear_cache(settings: &CacheSettings, older_than: Option<u64>) -> stack_compositor::Result<()> {
    let cache = RemoteAssetCache::open(&settings.dir, Duration::from_secs(settings.ttl_secs))?;
    let removed = cache.evict(older_than.map(Duration::from_secs))?;

    match older_than {
        Some(secs) => info!(
            "Removed {} cached file(s) older than {}s from {:?}",
            removed, secs, settings.dir
        ),
        None => info!("Removed {} cached file(s) from {:?}", removed, settings.dir),
    }
    Ok(())
}

/// Print the friendly message followed by the cause chain
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<CompositorError>() {
        Some(compositor_err) => eprintln!("Error: {}", compositor_err.user_message()),
        None => eprintln!("Error: {}", err),
    }

    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {}", cause);
    }
}
