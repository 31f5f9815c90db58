//! # Layout Engine
//!
//! Turns probed media properties plus text styling into absolute geometry:
//! scaled sizes, stacking offsets, hold-frame extensions and text
//! placement. Pure computation; pixels are the media engine's business.

pub mod types;

pub use types::{
    Canvas, Fill, FrameCounter, ItemGeometry, Layout, Rect, TextBlock, TextLine, TextMetrics,
};

use crate::config::{MediaItem, TextStyle};
use crate::engine::ProbeResult;

/// Inset of the frame-count text from the top-left corner
pub const FRAME_COUNTER_INSET: u32 = 10;

/// Inputs to the layout beyond the per-item data
#[derive(Debug, Clone)]
pub struct LayoutSettings<'a> {
    pub style: &'a TextStyle,
    /// Explicit output frame rate
    pub fps: Option<f64>,
    /// Canvas duration when every item has zero length (all stills)
    pub still_duration: f64,
}

impl TextMetrics {
    /// Spacing rules, all relative to the heading size `h`
    pub fn from_font_sizes(h: u32, s: u32) -> Self {
        let hf = h as f64;
        let spacing_between = (0.5 * hf).round() as u32;
        let vertical_padding = (0.6 * hf).round() as u32;
        let top_padding = (0.3 * hf).round() as u32;

        Self {
            heading_font_size: h,
            subheading_font_size: s,
            spacing_between,
            vertical_padding,
            top_padding,
            block_height: h + spacing_between + s + vertical_padding,
        }
    }
}

/// Width after scaling to `target_height`, rounded down to an even number
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    if height == 0 {
        return 2;
    }
    let exact = (width as u64 * target_height as u64) / height as u64;
    let even = exact - exact % 2;
    even.max(2) as u32
}

/// Compute the composite geometry.
///
/// `probes` and `items` are parallel slices in left-to-right order.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn compute_layout(probes: &[ProbeResult], items: &[MediaItem], settings: &LayoutSettings<'_>) -> Layout {
    assert_eq!(probes.len(), items.len(), "one probe result per item");

    let style = settings.style;
    let metrics = TextMetrics::from_font_sizes(style.heading_font_size, style.subheading_font_size);
    let fill = Fill {
        rgb: style.bg_color,
        opacity: style.bg_opacity,
    };

    let target_height = probes.iter().map(|p| p.height).max().unwrap_or(0);
    let longest = probes.iter().map(|p| p.duration).fold(0.0_f64, f64::max);
    let target_duration = if longest > 0.0 {
        longest
    } else {
        settings.still_duration
    };
    let fps = settings
        .fps
        .or_else(|| probes.first().map(|p| p.fps))
        .unwrap_or(crate::engine::DEFAULT_FPS);

    let mut x = 0u32;
    let mut geometry = Vec::with_capacity(items.len());

    for (index, (probe, item)) in probes.iter().zip(items).enumerate() {
        let width = scaled_width(probe.width, probe.height, target_height);
        let scale = if probe.height == 0 {
            1.0
        } else {
            target_height as f64 / probe.height as f64
        };

        let text = item
            .has_text()
            .then(|| text_block(item, &metrics, fill, &style.color, width, target_height));

        let frame_counter = style.show_frame_count.then(|| FrameCounter {
            background: Rect {
                x: 0,
                y: 0,
                width: (style.frame_count_font_size as f64 * 4.0).round() as u32,
                height: (style.frame_count_font_size as f64 * 1.5).round() as u32,
            },
            fill,
            color: style.color.clone(),
            font_size: style.frame_count_font_size,
            text_x: FRAME_COUNTER_INSET,
            text_y: FRAME_COUNTER_INSET,
            frame_count: item.frame_count_override.unwrap_or(probe.frame_count),
        });

        geometry.push(ItemGeometry {
            index,
            source_width: probe.width,
            source_height: probe.height,
            scale,
            width,
            height: target_height,
            x,
            extend_by: (target_duration - probe.duration).max(0.0),
            text,
            frame_counter,
        });

        x += width;
    }

    Layout {
        canvas: Canvas {
            width: x,
            height: target_height,
            duration: target_duration,
            fps,
        },
        metrics,
        items: geometry,
    }
}

fn text_block(
    item: &MediaItem,
    metrics: &TextMetrics,
    fill: Fill,
    color: &str,
    width: u32,
    height: u32,
) -> TextBlock {
    let box_y = height as i64 - metrics.block_height as i64;

    TextBlock {
        background: Rect {
            x: 0,
            y: box_y.max(0) as u32,
            width,
            height: metrics.block_height.min(height),
        },
        fill,
        color: color.to_string(),
        heading: item.heading.as_ref().map(|text| TextLine {
            text: text.clone(),
            font_size: metrics.heading_font_size,
            y: box_y + metrics.top_padding as i64,
        }),
        subheading: item.subheading.as_ref().map(|text| TextLine {
            text: text.clone(),
            font_size: metrics.subheading_font_size,
            y: height as i64 - metrics.vertical_padding as i64 - metrics.subheading_font_size as i64,
        }),
    }
}
