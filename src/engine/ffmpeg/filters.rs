//! Filter-graph fragments shared by both FFmpeg backends.

use std::path::Path;

use crate::layout::{FrameCounter, ItemGeometry, Rect, TextBlock, TextLine};

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

/// Escape a filter option value. The result is unquoted and survives both
/// parsing passes: the graph splitter first, then the option parser.
pub fn escape_filter_value(value: &str) -> String {
    let option_level = value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:");

    let mut escaped = String::with_capacity(option_level.len() * 2);
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn escape_ffmpeg_path(path: &Path) -> String {
    escape_filter_value(&path.to_string_lossy())
}

/// Escape text for drawtext's `text=` option. drawtext itself expands `%`
/// sequences and backslashes, so those are escaped once more.
pub fn escape_drawtext(text: &str) -> String {
    escape_filter_value(&text.replace('\\', "\\\\").replace('%', "\\%"))
}

/// The comma-separated filters that normalize and decorate one item:
/// frame rate, scale, hold-frame extension, text block, frame counter.
pub fn item_filters(geometry: &ItemGeometry, fps: f64, font_file: Option<&Path>) -> Vec<String> {
    let mut filters = vec![
        format!("fps={}", fps),
        format!("scale={}:{}", geometry.width, geometry.height),
        "setsar=1".to_string(),
    ];

    if geometry.extend_by > 0.0 {
        filters.push(format!(
            "tpad=stop_mode=clone:stop_duration={}",
            format_time(geometry.extend_by)
        ));
    }

    if let Some(block) = &geometry.text {
        push_text_block(&mut filters, block, font_file);
    }

    if let Some(counter) = &geometry.frame_counter {
        push_frame_counter(&mut filters, counter, font_file);
    }

    filters
}

/// `[input]f1,f2,...[output]`
pub fn labeled_chain(input: &str, filters: &[String], output: &str) -> String {
    format!("[{}]{}[{}]", input, filters.join(","), output)
}

/// Stack labeled streams left to right into `output`
pub fn hstack(inputs: &[String], output: &str) -> String {
    let labels: String = inputs.iter().map(|l| format!("[{}]", l)).collect();
    if inputs.len() == 1 {
        format!("{}null[{}]", labels, output)
    } else {
        format!("{}hstack=inputs={}[{}]", labels, inputs.len(), output)
    }
}

fn drawbox(rect: &Rect, color: &str) -> String {
    format!(
        "drawbox=x={}:y={}:w={}:h={}:color={}:t=fill",
        rect.x, rect.y, rect.width, rect.height, color
    )
}

fn drawtext(text: &str, font_size: u32, color: &str, x: &str, y: &str, font_file: Option<&Path>) -> String {
    let font = font_file
        .map(|f| format!("fontfile={}:", escape_ffmpeg_path(f)))
        .unwrap_or_default();
    format!(
        "drawtext={}text={}:fontsize={}:fontcolor={}:x={}:y={}",
        font,
        escape_drawtext(text),
        font_size,
        color,
        x,
        y
    )
}

fn centered_line(line: &TextLine, color: &str, font_file: Option<&Path>) -> String {
    drawtext(
        &line.text,
        line.font_size,
        color,
        "(w-text_w)/2",
        &line.y.to_string(),
        font_file,
    )
}

fn push_text_block(filters: &mut Vec<String>, block: &TextBlock, font_file: Option<&Path>) {
    filters.push(drawbox(&block.background, &block.fill.to_ffmpeg_color()));
    for line in [&block.heading, &block.subheading].into_iter().flatten() {
        filters.push(centered_line(line, &block.color, font_file));
    }
}

fn push_frame_counter(filters: &mut Vec<String>, counter: &FrameCounter, font_file: Option<&Path>) {
    filters.push(drawbox(&counter.background, &counter.fill.to_ffmpeg_color()));
    filters.push(drawtext(
        &counter.label(),
        counter.font_size,
        &counter.color,
        &counter.text_x.to_string(),
        &counter.text_y.to_string(),
        font_file,
    ));
}
