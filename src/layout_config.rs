//! Paginated layout – the frozen description of what goes on each page,
//! handed from pagination to the PDF painter.

use serde::Serialize;

/// A complete document layout ready for painting.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub pages: Vec<PageLayout>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content. Coordinates are relative
/// to the page's top-left corner, in points.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,
    pub text: Option<TextContent>,

    pub children: Vec<LayoutBox>,
}

/// Border widths per side, drawn as independent strokes.
#[derive(Debug, Clone, Serialize)]
pub struct BorderStyle {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Serialize)]
pub struct TextContent {
    /// Pre-wrapped, pre-aligned lines.
    pub lines: Vec<TextLine>,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    /// Distance between baselines, in points.
    pub line_height: f32,
    /// Offset of the first baseline from the top of the box.
    pub baseline: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the layout box (alignment).
    pub x_offset: f32,
}

impl LayoutConfig {
    /// Empty layout for the given page size.
    pub fn new(title: impl Into<String>, page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: title.into(),
            page_width_pt,
            page_height_pt,
            pages: Vec::new(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            children: Vec::new(),
        }
    }
}
