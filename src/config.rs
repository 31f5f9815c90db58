use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    fetch,
};

/// File suffixes treated as still images when `is_image` is not given
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

/// Whether an item is a moving video or a still image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Classify a path by its suffix
    pub fn detect(path: &str) -> Self {
        let is_image = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                IMAGE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);

        if is_image {
            Self::Image
        } else {
            Self::Video
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Image => "Image",
        }
    }
}

/// Where an item's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Local(PathBuf),
    Remote(String),
}

impl MediaSource {
    /// Shareable links become `Remote`, anything else is a local path
    pub fn parse(value: &str) -> Self {
        if fetch::recognize(value) {
            Self::Remote(value.to_string())
        } else {
            Self::Local(PathBuf::from(value))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn display(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
        }
    }
}

/// One video or image in the composite
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub source: MediaSource,
    pub kind: MediaKind,
    pub heading: Option<String>,
    pub subheading: Option<String>,
    /// Separate audio track replacing the item's own audio
    pub audio_override: Option<MediaSource>,
    /// Frame count shown by the diagnostic overlay; never used for timing
    pub frame_count_override: Option<u64>,
}

impl MediaItem {
    pub fn has_text(&self) -> bool {
        self.heading.is_some() || self.subheading.is_some()
    }

    /// Check that local files referenced by this item exist
    fn validate(&self) -> Result<()> {
        if let MediaSource::Local(path) = &self.source {
            if !path.exists() {
                return Err(ConfigError::MissingMedia {
                    kind: self.kind.label().to_string(),
                    path: path.display().to_string(),
                }
                .into());
            }
        }

        if let Some(MediaSource::Local(path)) = &self.audio_override {
            if !path.exists() {
                return Err(ConfigError::MissingMedia {
                    kind: "Audio".to_string(),
                    path: path.display().to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Output file and encoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output video path
    pub path: PathBuf,

    /// Output frame rate; unset means the first item's rate
    pub fps: Option<f64>,

    /// x264 preset
    pub preset: String,

    /// Encoder thread count
    pub threads: u32,

    /// Video bitrate, e.g. "15000k"
    pub bitrate: String,

    /// Audio bitrate, e.g. "192k"
    pub audio_bitrate: String,

    /// Composite length in seconds when every item is a still image
    pub still_duration: f64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output_composite.mp4"),
            fps: None,
            preset: "ultrafast".to_string(),
            threads: 4,
            bitrate: "15000k".to_string(),
            audio_bitrate: "192k".to_string(),
            still_duration: 5.0,
        }
    }
}

impl OutputSettings {
    fn validate(&self) -> Result<()> {
        if let Some(fps) = self.fps {
            if !(fps > 0.0) {
                return Err(ConfigError::InvalidValue {
                    key: "output.fps".to_string(),
                    value: fps.to_string(),
                }
                .into());
            }
        }

        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "output.threads".to_string(),
                value: self.threads.to_string(),
            }
            .into());
        }

        if !(self.still_duration > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "output.still_duration".to_string(),
                value: self.still_duration.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Heading/subheading styling and the frame-count overlay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub heading_font_size: u32,
    pub subheading_font_size: u32,

    /// Text color in any form the renderer accepts ("white", "0xFFFFFF")
    pub color: String,

    /// Background box color as RGB
    pub bg_color: [u8; 3],

    /// Background box opacity (0.0-1.0)
    pub bg_opacity: f32,

    /// Draw each item's frame count in its top-left corner
    pub show_frame_count: bool,

    pub frame_count_font_size: u32,

    /// Font used for all text; the renderer's default when unset
    pub font_file: Option<PathBuf>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            heading_font_size: 60,
            subheading_font_size: 36,
            color: "white".to_string(),
            bg_color: [0, 0, 0],
            bg_opacity: 0.7,
            show_frame_count: false,
            frame_count_font_size: 24,
            font_file: None,
        }
    }
}

impl TextStyle {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.bg_opacity) {
            return Err(ConfigError::InvalidValue {
                key: "text.bg_opacity".to_string(),
                value: self.bg_opacity.to_string(),
            }
            .into());
        }

        for (key, size) in [
            ("text.heading_font_size", self.heading_font_size),
            ("text.subheading_font_size", self.subheading_font_size),
            ("text.frame_count_font_size", self.frame_count_font_size),
        ] {
            if size == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: size.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Where remote downloads are kept and for how long
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: PathBuf,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./asset_cache"),
            ttl_secs: 86_400,
        }
    }
}

/// A fully loaded and validated composite description
#[derive(Debug, Clone)]
pub struct CompositeSpec {
    /// Items in left-to-right order
    pub items: Vec<MediaItem>,
    pub output: OutputSettings,
    pub text: TextStyle,
    pub cache: CacheSettings,
}

/// One `[[videos]]` or `[[image]]` entry as written in the file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ItemEntry {
    path: String,
    heading: String,
    subheading: String,
    audio_path: String,
    is_image: Option<bool>,
    frame_count: Option<u64>,
}

impl ItemEntry {
    fn into_item(self, forced_kind: Option<MediaKind>) -> MediaItem {
        let kind = forced_kind.unwrap_or_else(|| match self.is_image {
            Some(true) => MediaKind::Image,
            Some(false) => MediaKind::Video,
            None => MediaKind::detect(&self.path),
        });

        MediaItem {
            source: MediaSource::parse(&self.path),
            kind,
            heading: non_empty(self.heading),
            subheading: non_empty(self.subheading),
            audio_override: non_empty(self.audio_path).map(|p| MediaSource::parse(&p)),
            frame_count_override: self.frame_count,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// The document as written, before item merging and validation
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigDocument {
    output: OutputSettings,
    text: TextStyle,
    cache: CacheSettings,
    videos: Vec<ItemEntry>,
    image: Vec<ItemEntry>,
}

impl CompositeSpec {
    /// Load and validate a composite description from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)?;
        let spec = Self::from_toml_str(&content).map_err(|e| match e {
            crate::CompositorError::Config(ConfigError::ParseFailed { reason, .. }) => {
                ConfigError::ParseFailed {
                    path: path.display().to_string(),
                    reason,
                }
                .into()
            }
            other => other,
        })?;

        debug!("Loaded {} item(s) from {}", spec.items.len(), path.display());
        Ok(spec)
    }

    /// Parse and validate a composite description from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let document: ConfigDocument =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed {
                path: "<string>".to_string(),
                reason: e.to_string(),
            })?;

        // Images always follow videos
        let items = document
            .videos
            .into_iter()
            .map(|entry| entry.into_item(None))
            .chain(
                document
                    .image
                    .into_iter()
                    .map(|entry| entry.into_item(Some(MediaKind::Image))),
            )
            .collect();

        let spec = Self {
            items,
            output: document.output,
            text: document.text,
            cache: document.cache,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Validate settings and check every referenced local file
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(ConfigError::Empty.into());
        }

        self.output.validate()?;
        self.text.validate()?;

        for item in &self.items {
            item.validate()?;
        }

        Ok(())
    }

    /// Whether any item or audio track needs the remote asset cache
    pub fn has_remote_sources(&self) -> bool {
        self.items.iter().any(|item| {
            item.source.is_remote()
                || item
                    .audio_override
                    .as_ref()
                    .map(MediaSource::is_remote)
                    .unwrap_or(false)
        })
    }
}

/// Map a CLI argument to a config file.
///
/// A directory `foo/` maps to the sibling file `foo.toml`.
pub fn resolve_config_path<P: AsRef<Path>>(input: P) -> Result<PathBuf> {
    let input = input.as_ref();
    if !input.is_dir() {
        return Ok(input.to_path_buf());
    }

    // "." and similar have no file name until canonicalized
    let dir = if input.file_name().is_some() {
        input.to_path_buf()
    } else {
        input.canonicalize()?
    };
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    let config_path = parent.join(format!("{}.toml", name));

    if !config_path.is_file() {
        return Err(ConfigError::NotFound {
            path: config_path.display().to_string(),
        }
        .into());
    }

    Ok(config_path)
}

const EXAMPLE_CONFIG: &str = r#"# Video Composite Configuration

# Output settings
[output]
path = "output_composite.mp4"
# fps = 24  # Optional: leave unset to use the first item's frame rate
preset = "ultrafast"  # ultrafast, superfast, veryfast, faster, fast, medium, slow, slower, veryslow
threads = 4  # CPU threads used for encoding
bitrate = "5000k"  # Video bitrate, e.g. "5000k" or "10000k" for higher quality
# audio_bitrate = "192k"
# still_duration = 5.0  # Length in seconds when every item is an image

# Text styling
[text]
heading_font_size = 60
subheading_font_size = 36
color = "white"
bg_color = [0, 0, 0]  # RGB values
bg_opacity = 0.7
# show_frame_count = true  # Draw each item's frame count in the top-left corner
# frame_count_font_size = 24
# font_file = "/usr/share/fonts/TTF/DejaVuSans.ttf"
# Spacing and padding are derived from heading_font_size:
# spacing between lines = 50%, vertical padding = 60%, top padding = 30%

# Remote downloads (shareable drive links)
# [cache]
# dir = "./asset_cache"
# ttl_secs = 86400

# Videos/images to composite side by side, left to right.
# Images are detected by extension (.jpg, .png, ...); set is_image to override.
# A path may also be a shareable drive link; it is downloaded and cached.
[[videos]]
path = "video1.mp4"
heading = "First Video"
subheading = "Description for first video"
# audio_path = "custom_audio1.mp3"  # Optional: replaces this item's audio
# frame_count = 240  # Optional: value shown by the frame-count overlay

[[videos]]
path = "video2.mp4"
heading = "Second Video"
subheading = "Description for second video"

[[videos]]
path = "image1.jpg"
heading = "Static Image"
subheading = "This will be shown as a static frame"
# is_image = true

# Entries below are always images and come AFTER every [[videos]] entry
# [[image]]
# path = "reference.jpg"
# heading = "Reference Image"
# subheading = "Optional description"
"#;

/// Write a commented example configuration
pub fn write_example<P: AsRef<Path>>(path: P) -> Result<()> {
    std::fs::write(path, EXAMPLE_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompositorError;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, b"media").unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_defaults_applied() {
        let dir = tempdir().unwrap();
        let video = touch(dir.path(), "a.mp4");
        let toml = format!("[[videos]]\npath = {:?}\n", video);

        let spec = CompositeSpec::from_toml_str(&toml).unwrap();
        assert_eq!(spec.output.preset, "ultrafast");
        assert_eq!(spec.output.threads, 4);
        assert_eq!(spec.output.bitrate, "15000k");
        assert_eq!(spec.output.fps, None);
        assert_eq!(spec.text.heading_font_size, 60);
        assert_eq!(spec.text.subheading_font_size, 36);
        assert_eq!(spec.text.color, "white");
        assert_eq!(spec.text.bg_color, [0, 0, 0]);
        assert!((spec.text.bg_opacity - 0.7).abs() < f32::EPSILON);
        assert_eq!(spec.cache.ttl_secs, 86_400);
    }

    #[test]
    fn test_images_follow_videos_in_order() {
        let dir = tempdir().unwrap();
        let v1 = touch(dir.path(), "v1.mp4");
        let v2 = touch(dir.path(), "v2.png");
        let i1 = touch(dir.path(), "i1.mp4");
        let i2 = touch(dir.path(), "i2.jpg");

        // image entries written first in the file still land last
        let toml = format!(
            "[[image]]\npath = {i1:?}\n[[image]]\npath = {i2:?}\n[[videos]]\npath = {v1:?}\n[[videos]]\npath = {v2:?}\n"
        );
        let spec = CompositeSpec::from_toml_str(&toml).unwrap();

        let paths: Vec<String> = spec.items.iter().map(|i| i.source.display()).collect();
        assert_eq!(paths, vec![v1, v2, i1, i2]);

        let kinds: Vec<MediaKind> = spec.items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![MediaKind::Video, MediaKind::Image, MediaKind::Image, MediaKind::Image]
        );
    }

    #[test]
    fn test_is_image_overrides_detection() {
        let dir = tempdir().unwrap();
        let still = touch(dir.path(), "still.mp4");
        let moving = touch(dir.path(), "moving.PNG");
        let toml = format!(
            "[[videos]]\npath = {still:?}\nis_image = true\n[[videos]]\npath = {moving:?}\nis_image = false\n"
        );

        let spec = CompositeSpec::from_toml_str(&toml).unwrap();
        assert_eq!(spec.items[0].kind, MediaKind::Image);
        assert_eq!(spec.items[1].kind, MediaKind::Video);
    }

    #[test]
    fn test_kind_detection_is_case_insensitive() {
        assert_eq!(MediaKind::detect("photo.JPEG"), MediaKind::Image);
        assert_eq!(MediaKind::detect("scan.tiff"), MediaKind::Image);
        assert_eq!(MediaKind::detect("clip.mov"), MediaKind::Video);
        assert_eq!(MediaKind::detect("no_extension"), MediaKind::Video);
    }

    #[test]
    fn test_text_fields_and_overrides() {
        let dir = tempdir().unwrap();
        let video = touch(dir.path(), "a.mp4");
        let audio = touch(dir.path(), "a.mp3");
        let toml = format!(
            "[[videos]]\npath = {video:?}\nheading = \"Title\"\nsubheading = \"\"\naudio_path = {audio:?}\nframe_count = 120\n"
        );

        let spec = CompositeSpec::from_toml_str(&toml).unwrap();
        let item = &spec.items[0];
        assert_eq!(item.heading.as_deref(), Some("Title"));
        assert_eq!(item.subheading, None);
        assert!(item.has_text());
        assert_eq!(item.audio_override, Some(MediaSource::Local(PathBuf::from(audio))));
        assert_eq!(item.frame_count_override, Some(120));
    }

    #[test]
    fn test_empty_config_rejected() {
        let err = CompositeSpec::from_toml_str("[output]\npath = \"out.mp4\"\n").unwrap_err();
        assert!(matches!(err, CompositorError::Config(ConfigError::Empty)));
    }

    #[test]
    fn test_missing_media_rejected() {
        let dir = tempdir().unwrap();
        let present = touch(dir.path(), "a.mp4");
        let missing = dir.path().join("missing.mp4").display().to_string();
        let toml = format!("[[videos]]\npath = {present:?}\n[[videos]]\npath = {missing:?}\n");

        match CompositeSpec::from_toml_str(&toml).unwrap_err() {
            CompositorError::Config(ConfigError::MissingMedia { kind, path }) => {
                assert_eq!(kind, "Video");
                assert_eq!(path, missing);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_audio_override_rejected() {
        let dir = tempdir().unwrap();
        let video = touch(dir.path(), "a.mp4");
        let toml = format!("[[videos]]\npath = {video:?}\naudio_path = \"nowhere.mp3\"\n");

        match CompositeSpec::from_toml_str(&toml).unwrap_err() {
            CompositorError::Config(ConfigError::MissingMedia { kind, path }) => {
                assert_eq!(kind, "Audio");
                assert_eq!(path, "nowhere.mp3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_remote_links_skip_existence_check() {
        let toml = "[[videos]]\npath = \"https://drive.google.com/file/d/1ABC/view\"\n";
        let spec = CompositeSpec::from_toml_str(toml).unwrap();
        assert!(spec.has_remote_sources());
        assert!(spec.items[0].source.is_remote());
    }

    #[test]
    fn test_invalid_opacity_rejected() {
        let dir = tempdir().unwrap();
        let video = touch(dir.path(), "a.mp4");
        let toml = format!("[text]\nbg_opacity = 1.5\n[[videos]]\npath = {video:?}\n");
        let err = CompositeSpec::from_toml_str(&toml).unwrap_err();
        assert!(matches!(
            err,
            CompositorError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = CompositeSpec::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(
            err,
            CompositorError::Config(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[[videos]\npath = ").unwrap();

        match CompositeSpec::load(&path).unwrap_err() {
            CompositorError::Config(ConfigError::ParseFailed { path: p, .. }) => {
                assert_eq!(p, path.display().to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_example_config_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("example_config.toml");
        write_example(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let document: ConfigDocument = toml::from_str(&content).unwrap();
        assert_eq!(document.videos.len(), 3);
        assert!(document.image.is_empty());
        assert_eq!(document.output.bitrate, "5000k");
    }

    #[test]
    fn test_directory_argument_maps_to_sibling_toml() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("vid2");
        std::fs::create_dir(&project).unwrap();

        assert!(resolve_config_path(&project).is_err());

        let sibling = dir.path().join("vid2.toml");
        std::fs::write(&sibling, "").unwrap();
        assert_eq!(resolve_config_path(&project).unwrap(), sibling);

        let file = dir.path().join("other.toml");
        assert_eq!(resolve_config_path(&file).unwrap(), file);
    }
}
