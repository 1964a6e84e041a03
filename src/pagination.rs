//! Pagination – splits positioned boxes into fixed-size pages.
//!
//! Handles:
//! - page boundaries at the bottom margin
//! - break-before / break-after hints
//! - table row splitting across pages
//! - line alignment offsets for text boxes

use crate::fonts::{baseline_offset, line_height, text_width};
use crate::layout::{BoxContent, PositionedBox};
use crate::layout_config::{BorderStyle, LayoutBox, LayoutConfig, PageLayout, TextContent, TextLine};
use crate::style::{Display, TextAlign};

/// Recursively expand pure containers taller than a page so their children
/// can be placed individually.
fn flatten_for_pagination(boxes: &[PositionedBox], content_height: f32) -> Vec<&PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && pbox.content == BoxContent::None
            && pbox.style.display != Display::Table
            && !pbox.children.is_empty()
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

struct Paginator {
    config: LayoutConfig,
    current: PageLayout,
    /// Document-space y at which the current page begins.
    page_start: f32,
    content_height: f32,
    margin: f32,
}

impl Paginator {
    fn break_page(&mut self, next_start: f32) {
        let index = self.config.pages.len() + 1;
        let done = std::mem::replace(
            &mut self.current,
            PageLayout {
                page_index: index,
                boxes: Vec::new(),
            },
        );
        self.config.pages.push(done);
        self.page_start = next_start;
    }

    fn fits(&self, pbox: &PositionedBox) -> bool {
        let y_on_page = (pbox.y - self.page_start).max(0.0);
        y_on_page + pbox.height <= self.content_height
    }

    /// A box that does not fit and is not alone on its page.
    fn overflows(&self, pbox: &PositionedBox) -> bool {
        !self.fits(pbox) && !self.current.boxes.is_empty()
    }

    fn place(&mut self, pbox: &PositionedBox) {
        let y = self.margin + (pbox.y - self.page_start).max(0.0);
        self.current.boxes.push(build_layout_box(pbox, pbox.x, y));
    }

    fn place_split_table(&mut self, table: &PositionedBox) {
        for row in &table.children {
            if self.overflows(row) {
                self.break_page(row.y);
            }
            self.place(row);
        }
    }

    fn finish(mut self) -> LayoutConfig {
        if !self.current.boxes.is_empty() || self.config.pages.is_empty() {
            self.current.page_index = self.config.pages.len();
            self.config.pages.push(self.current);
        }
        self.config
    }
}

/// Convert positioned boxes into a paginated [`LayoutConfig`]. Always yields
/// at least one page.
pub fn paginate(
    boxes: &[PositionedBox],
    title: &str,
    page_width: f32,
    page_height: f32,
    page_margin: f32,
) -> LayoutConfig {
    let content_height = page_height - 2.0 * page_margin;
    let mut pager = Paginator {
        config: LayoutConfig::new(title, page_width, page_height),
        current: PageLayout {
            page_index: 0,
            boxes: Vec::new(),
        },
        page_start: 0.0,
        content_height,
        margin: page_margin,
    };

    let mut break_pending = false;
    for pbox in flatten_for_pagination(boxes, content_height) {
        let wants_break = break_pending || pbox.style.page_break_before;
        if wants_break && !pager.current.boxes.is_empty() {
            pager.break_page(pbox.y);
        }
        break_pending = pbox.style.page_break_after;

        if !pager.fits(pbox) {
            let splittable = pbox.style.display == Display::Table
                && !pbox.children.is_empty()
                && !pbox.style.page_break_inside_avoid;
            if splittable {
                pager.place_split_table(pbox);
                continue;
            }
            if pager.overflows(pbox) {
                pager.break_page(pbox.y);
            }
        }
        pager.place(pbox);
    }
    pager.finish()
}

/// Build a LayoutBox tree with page-absolute coordinates. Children keep
/// their offset from the parent: `child_y = parent_y + (child.y - parent.y)`.
fn build_layout_box(pbox: &PositionedBox, abs_x: f32, abs_y: f32) -> LayoutBox {
    let style = &pbox.style;
    let mut lb = LayoutBox::new(abs_x, abs_y, pbox.width, pbox.height);

    if !style.background_color.is_transparent() {
        lb.background_color = Some(style.background_color.to_array());
    }
    if !style.border.is_zero() {
        lb.border = Some(BorderStyle {
            top: style.border.top,
            right: style.border.right,
            bottom: style.border.bottom,
            left: style.border.left,
            color: style.border_color.to_array(),
        });
    }

    if let BoxContent::Text { lines } = &pbox.content {
        let text_lines = lines
            .iter()
            .map(|line| {
                let slack = (pbox.width - text_width(line, style.font_size, style.bold)).max(0.0);
                TextLine {
                    text: line.clone(),
                    x_offset: match style.text_align {
                        TextAlign::Left => 0.0,
                        TextAlign::Center => slack / 2.0,
                        TextAlign::Right => slack,
                    },
                }
            })
            .collect();
        lb.text = Some(TextContent {
            lines: text_lines,
            font_size: style.font_size,
            bold: style.bold,
            italic: style.italic,
            color: style.color.to_array(),
            line_height: line_height(style.font_size, style.line_height),
            baseline: baseline_offset(style.font_size, style.line_height),
        });
    }

    lb.children = pbox
        .children
        .iter()
        .map(|child| build_layout_box(child, child.x, abs_y + (child.y - pbox.y)))
        .collect();
    lb
}
