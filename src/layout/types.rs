/// An axis-aligned rectangle in item-local pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Box fill: RGB color at an opacity between 0 and 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub rgb: [u8; 3],
    pub opacity: f32,
}

impl Fill {
    /// `0xRRGGBB@opacity`, the color syntax FFmpeg filters accept
    pub fn to_ffmpeg_color(&self) -> String {
        format!(
            "0x{:02X}{:02X}{:02X}@{}",
            self.rgb[0], self.rgb[1], self.rgb[2], self.opacity
        )
    }
}

/// Spacing derived from the heading and subheading font sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub heading_font_size: u32,
    pub subheading_font_size: u32,
    pub spacing_between: u32,
    pub vertical_padding: u32,
    pub top_padding: u32,
    /// Height of the background box behind both lines
    pub block_height: u32,
}

/// A line of text horizontally centered in its item, at a fixed top offset
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub font_size: u32,
    pub y: i64,
}

/// Background box plus the heading and subheading drawn over it
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub background: Rect,
    pub fill: Fill,
    pub color: String,
    pub heading: Option<TextLine>,
    pub subheading: Option<TextLine>,
}

/// Top-left diagnostic overlay showing the item's frame count
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCounter {
    pub background: Rect,
    pub fill: Fill,
    pub color: String,
    pub font_size: u32,
    pub text_x: u32,
    pub text_y: u32,
    pub frame_count: u64,
}

impl FrameCounter {
    pub fn label(&self) -> String {
        format!("Frames: {}", self.frame_count)
    }
}

/// Where and how one item lands in the composite
#[derive(Debug, Clone, PartialEq)]
pub struct ItemGeometry {
    pub index: usize,
    pub source_width: u32,
    pub source_height: u32,
    pub scale: f64,
    /// Scaled size; `height` equals the canvas height
    pub width: u32,
    pub height: u32,
    /// Left edge on the canvas
    pub x: u32,
    /// Seconds of held last frame appended to reach the canvas duration
    pub extend_by: f64,
    pub text: Option<TextBlock>,
    pub frame_counter: Option<FrameCounter>,
}

/// The output frame all items are stacked into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub fps: f64,
}

/// Complete geometry for a composite
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub canvas: Canvas,
    pub metrics: TextMetrics,
    pub items: Vec<ItemGeometry>,
}
