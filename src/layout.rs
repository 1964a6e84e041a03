//! Layout engine – uses Taffy to compute flexbox layout for a styled tree,
//! then converts the result into positioned boxes in document coordinates.

use std::collections::HashMap;

use taffy::prelude::*;

use crate::dom::Tag;
use crate::error::ExportError;
use crate::fonts::{line_height, text_width, wrap_text};
use crate::style::{self, ComputedStyle, StyledNode, TextAlign};

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoxContent {
    None,
    /// Word-wrapped lines of a single text run.
    Text { lines: Vec<String> },
}

fn layout_err(e: taffy::TaffyError) -> ExportError {
    ExportError::Layout(e.to_string())
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder {
    taffy: TaffyTree<()>,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
}

impl LayoutBuilder {
    fn new() -> Self {
        // Boxes keep fractional points so cells match the widths text was
        // wrapped to.
        let mut taffy = TaffyTree::new();
        taffy.disable_rounding();
        Self {
            taffy,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
        }
    }

    /// Append the text of an inline subtree to `out`, collapsing whitespace.
    /// `<br>` becomes a hard line break.
    fn collect_inline_text(node: &StyledNode, out: &mut String) {
        match node {
            StyledNode::Text { text, .. } => {
                for c in text.chars() {
                    if c.is_whitespace() && c != '\u{a0}' {
                        if !out.is_empty() && !out.ends_with(&[' ', '\n'][..]) {
                            out.push(' ');
                        }
                    } else {
                        out.push(c);
                    }
                }
            }
            StyledNode::Element { tag: Tag::Br, .. } => {
                out.truncate(out.trim_end_matches(' ').len());
                out.push('\n');
            }
            StyledNode::Element { children, .. } => {
                for child in children {
                    Self::collect_inline_text(child, out);
                }
            }
        }
    }

    fn inline_text(run: &[&StyledNode]) -> String {
        let mut raw = String::new();
        for node in run {
            Self::collect_inline_text(node, &mut raw);
        }
        raw.split('\n')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim_matches('\n')
            .to_string()
    }

    /// True when every non-blank text run in `run` is bold.
    fn run_is_bold(run: &[&StyledNode]) -> bool {
        fn visit(node: &StyledNode, seen: &mut bool) -> bool {
            match node {
                StyledNode::Text { text, style } => {
                    if text.trim().is_empty() {
                        return true;
                    }
                    *seen = true;
                    style.bold
                }
                StyledNode::Element { children, .. } => children.iter().all(|c| visit(c, seen)),
            }
        }
        let mut seen = false;
        run.iter().all(|n| visit(n, &mut seen)) && seen
    }

    /// Build a wrapped text leaf for an inline run laid out in `max_width`.
    fn build_text_leaf(
        &mut self,
        run: &[&StyledNode],
        block_style: &ComputedStyle,
        max_width: f32,
    ) -> Result<Option<NodeId>, ExportError> {
        let mut text = Self::inline_text(run);
        if text.is_empty() {
            return Ok(None);
        }
        let mut style = block_style.clone();
        style.bold = style.bold || Self::run_is_bold(run);
        if style.uppercase {
            text = text.to_uppercase();
        }

        let lines = wrap_text(&text, style.font_size, style.bold, max_width.max(1.0));
        let text_w = lines
            .iter()
            .map(|l| text_width(l, style.font_size, style.bold))
            .fold(0.0f32, f32::max);
        let text_h = lines.len() as f32 * line_height(style.font_size, style.line_height);

        let node = self
            .taffy
            .new_leaf(Style {
                size: Size {
                    width: Dimension::Length(text_w.ceil()),
                    height: Dimension::Length(text_h),
                },
                flex_shrink: 0.0,
                ..Default::default()
            })
            .map_err(layout_err)?;
        self.node_styles.insert(node, style);
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(Some(node))
    }

    /// Build the children of a container. Consecutive inline children are
    /// merged into one text run, except that inline elements inside a row
    /// become row items of their own.
    fn build_children(
        &mut self,
        parent_style: &ComputedStyle,
        children: &[StyledNode],
        slots: &[f32],
        inner_width: f32,
        in_row: bool,
    ) -> Result<Vec<NodeId>, ExportError> {
        let mut ids = Vec::new();
        let mut run: Vec<&StyledNode> = Vec::new();
        let mut slot = slots.iter();

        for child in children {
            let row_item = in_row && matches!(child, StyledNode::Element { .. });
            if child.is_inline() && !row_item {
                run.push(child);
                continue;
            }
            if let Some(id) = self.flush_run(&mut run, parent_style, inner_width)? {
                ids.push(id);
            }
            let width = if in_row {
                slot.next().copied().unwrap_or(inner_width)
            } else {
                inner_width
            };
            if let Some(id) = self.build_node(child, width, in_row)? {
                ids.push(id);
            }
        }
        if let Some(id) = self.flush_run(&mut run, parent_style, inner_width)? {
            ids.push(id);
        }
        Ok(ids)
    }

    fn flush_run(
        &mut self,
        run: &mut Vec<&StyledNode>,
        style: &ComputedStyle,
        width: f32,
    ) -> Result<Option<NodeId>, ExportError> {
        if run.is_empty() {
            return Ok(None);
        }
        let id = self.build_text_leaf(run, style, width)?;
        run.clear();
        Ok(id)
    }

    /// `available` is the containing block's inner width, or the assigned
    /// slot width when the node is an item of a row.
    fn build_node(
        &mut self,
        styled: &StyledNode,
        available: f32,
        in_row: bool,
    ) -> Result<Option<NodeId>, ExportError> {
        let (tag, style, children, colspan) = match styled {
            StyledNode::Text { style, .. } => {
                return self.build_text_leaf(&[styled], style, available)
            }
            StyledNode::Element {
                tag,
                style,
                children,
                colspan,
            } => (tag, style, children, *colspan),
        };

        let outer = if in_row {
            available
        } else {
            match style.width {
                style::Dimension::Px(w) => w,
                style::Dimension::Percent(p) => available * p / 100.0,
                style::Dimension::Auto => available - style.margin.horizontal(),
            }
        };
        let inner = (outer - style.padding.horizontal() - style.border.horizontal()).max(1.0);

        let is_row = matches!(
            style.display,
            style::Display::Flex | style::Display::TableRow
        );
        let slots = if is_row {
            row_slots(style, children, inner)
        } else {
            Vec::new()
        };
        let child_ids = self.build_children(style, children, &slots, inner, is_row)?;

        let has_text = child_ids
            .iter()
            .any(|id| matches!(self.node_content.get(id), Some(BoxContent::Text { .. })));
        let taffy_style = computed_to_taffy(style, tag, in_row, has_text, colspan as f32);

        let node = self
            .taffy
            .new_with_children(taffy_style, &child_ids)
            .map_err(layout_err)?;
        self.node_styles.insert(node, style.clone());
        Ok(Some(node))
    }

    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox, ExportError> {
        let layout = self.taffy.layout(node).map_err(layout_err)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)
            .map_err(layout_err)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            content,
            children,
        })
    }
}

/// Estimated outer width of each element child of a row, used to word-wrap
/// text before Taffy runs. Explicit widths are honoured; the rest share
/// what remains (weighted by colspan for cells).
fn row_slots(style: &ComputedStyle, children: &[StyledNode], inner: f32) -> Vec<f32> {
    let items: Vec<(&ComputedStyle, f32)> = children
        .iter()
        .filter_map(|c| match c {
            StyledNode::Element { style, colspan, .. } => Some((style, *colspan as f32)),
            StyledNode::Text { .. } => None,
        })
        .collect();
    if items.is_empty() {
        return Vec::new();
    }

    let gaps = style.gap * (items.len() - 1) as f32;
    let avail = (inner - gaps).max(1.0);
    let fixed = |s: &ComputedStyle| match s.width {
        style::Dimension::Px(w) => Some(w),
        style::Dimension::Percent(p) => Some(avail * p / 100.0),
        style::Dimension::Auto => None,
    };

    let claimed: f32 = items.iter().filter_map(|(s, _)| fixed(s)).sum();
    let shares: f32 = items
        .iter()
        .filter(|(s, _)| fixed(s).is_none())
        .map(|(_, span)| span)
        .sum();
    let per_share = if shares > 0.0 {
        ((avail - claimed) / shares).max(1.0)
    } else {
        0.0
    };

    items
        .iter()
        .map(|(s, span)| fixed(s).unwrap_or(per_share * span))
        .collect()
}

fn computed_to_taffy(
    s: &ComputedStyle,
    tag: &Tag,
    in_row: bool,
    has_text: bool,
    colspan: f32,
) -> Style {
    let mut ts = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        ..Default::default()
    };

    match s.display {
        style::Display::Flex | style::Display::TableRow => {
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.justify_content = Some(match s.justify_content {
                style::JustifyContent::Start => taffy::JustifyContent::Start,
                style::JustifyContent::End => taffy::JustifyContent::End,
                style::JustifyContent::Center => taffy::JustifyContent::Center,
                style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
            });
        }
        _ if has_text => {
            ts.align_items = Some(match s.text_align {
                TextAlign::Left => taffy::AlignItems::Start,
                TextAlign::Center => taffy::AlignItems::Center,
                TextAlign::Right => taffy::AlignItems::End,
            });
        }
        _ => {}
    }

    ts.size.width = match s.width {
        style::Dimension::Auto => Dimension::Auto,
        style::Dimension::Px(v) => Dimension::Length(v),
        style::Dimension::Percent(v) => Dimension::Percent(v / 100.0),
    };
    if *tag == Tag::Tr {
        ts.size.width = Dimension::Percent(1.0);
    }

    if in_row {
        ts.min_size.width = Dimension::Length(0.0);
        if s.display == style::Display::TableCell && s.width == style::Dimension::Auto {
            ts.flex_grow = colspan;
            ts.flex_basis = Dimension::Length(0.0);
        } else if s.flex_grow > 0.0 {
            ts.flex_grow = s.flex_grow;
            ts.flex_basis = Dimension::Length(0.0);
        }
    }

    ts.margin = Rect {
        top: LengthPercentageAuto::Length(s.margin.top),
        right: LengthPercentageAuto::Length(s.margin.right),
        bottom: LengthPercentageAuto::Length(s.margin.bottom),
        left: LengthPercentageAuto::Length(s.margin.left),
    };
    ts.padding = Rect {
        top: LengthPercentage::Length(s.padding.top),
        right: LengthPercentage::Length(s.padding.right),
        bottom: LengthPercentage::Length(s.padding.bottom),
        left: LengthPercentage::Length(s.padding.left),
    };
    ts.border = Rect {
        top: LengthPercentage::Length(s.border.top),
        right: LengthPercentage::Length(s.border.right),
        bottom: LengthPercentage::Length(s.border.bottom),
        left: LengthPercentage::Length(s.border.left),
    };
    ts.gap = Size {
        width: LengthPercentage::Length(s.gap),
        height: LengthPercentage::Length(s.gap),
    };
    ts
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned
/// boxes in document coordinates (x already shifted by `page_margin`).
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    page_width: f32,
    page_margin: f32,
) -> Result<Vec<PositionedBox>, ExportError> {
    let content_width = page_width - 2.0 * page_margin;
    let mut builder = LayoutBuilder::new();

    let root_style = ComputedStyle::default();
    let child_ids =
        builder.build_children(&root_style, styled_nodes, &[], content_width, false)?;

    let root = builder
        .taffy
        .new_with_children(
            Style {
                display: taffy::Display::Flex,
                flex_direction: taffy::FlexDirection::Column,
                size: Size {
                    width: Dimension::Length(content_width),
                    height: Dimension::Auto,
                },
                ..Default::default()
            },
            &child_ids,
        )
        .map_err(layout_err)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_err)?;

    Ok(builder.extract(root, page_margin, 0.0)?.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::style::build_styled_tree;

    fn layout(html: &str) -> Vec<PositionedBox> {
        let styled = build_styled_tree(&parse_html(html), None);
        compute_layout(&styled, 595.0, 40.0).unwrap()
    }

    fn text_of(b: &PositionedBox) -> Vec<String> {
        let mut out = Vec::new();
        if let BoxContent::Text { lines } = &b.content {
            out.extend(lines.iter().cloned());
        }
        for c in &b.children {
            out.extend(text_of(c));
        }
        out
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>");
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].width > 0.0);
        assert!(boxes[0].height > 0.0);
        assert_eq!(text_of(&boxes[0]), vec!["Hello world"]);
    }

    #[test]
    fn inline_runs_merge_and_breaks_split() {
        let boxes = layout("<p><strong>Bill</strong> to:<br>Acme   Corp</p>");
        assert_eq!(text_of(&boxes[0]), vec!["Bill to:", "Acme Corp"]);
    }

    #[test]
    fn fully_bold_runs_are_bold() {
        let boxes = layout("<div><strong>Total</strong></div>");
        let leaf = &boxes[0].children[0];
        assert!(leaf.style.bold);
    }

    #[test]
    fn right_aligned_text_hugs_the_right_edge() {
        let boxes = layout(r#"<div class="text-right">41888.82</div>"#);
        let container = &boxes[0];
        let leaf = &container.children[0];
        let right = leaf.x + leaf.width;
        assert!((right - (container.x + container.width)).abs() < 1.0);
    }

    #[test]
    fn table_cells_share_row_width() {
        let boxes = layout("<table><tr><td>A</td><td>B</td></tr></table>");
        let row = &boxes[0].children[0];
        assert_eq!(row.children.len(), 2);
        let (a, b) = (&row.children[0], &row.children[1]);
        assert!((a.width - b.width).abs() < 0.01);
        assert!((a.width + b.width - 515.0).abs() < 0.01);
        assert!(b.x > a.x);
    }

    #[test]
    fn cell_widths_match_wrap_slots() {
        let html = "<table><tr><td>One</td><td>Two</td><td>Three</td></tr></table>";
        let styled = build_styled_tree(&parse_html(html), None);
        let StyledNode::Element { children: rows, .. } = &styled[0] else {
            panic!("expected a table element");
        };
        let StyledNode::Element { style, children: cells, .. } = &rows[0] else {
            panic!("expected a row element");
        };
        let slots = row_slots(style, cells, 515.0);

        let boxes = compute_layout(&styled, 595.0, 40.0).unwrap();
        let row = &boxes[0].children[0];
        assert_eq!(row.children.len(), slots.len());
        for (cell, slot) in row.children.iter().zip(&slots) {
            assert!((cell.width - 515.0 / 3.0).abs() < 0.01, "width {}", cell.width);
            assert!((cell.width - slot).abs() < 0.01);
        }
    }

    #[test]
    fn explicit_cell_widths_are_respected() {
        let boxes = layout(
            r#"<table><tr><td style="width: 50%">A</td><td>B</td><td>C</td></tr></table>"#,
        );
        let row = &boxes[0].children[0];
        assert!((row.children[0].width - 257.5).abs() < 1.0);
        assert!((row.children[1].width - 128.75).abs() < 1.0);
    }

    #[test]
    fn flex_row_places_children_side_by_side() {
        let boxes = layout(
            r#"<div class="flex justify-between"><div>From</div><div>To</div></div>"#,
        );
        let row = &boxes[0];
        let (a, b) = (&row.children[0], &row.children[1]);
        assert!((a.y - b.y).abs() < 0.01);
        assert!(b.x > a.x + a.width);
    }

    #[test]
    fn spans_in_a_flex_row_stay_separate() {
        let boxes = layout(
            r#"<div class="flex justify-between"><span>Subtotal</span><span>35499.00</span></div>"#,
        );
        let row = &boxes[0];
        assert_eq!(row.children.len(), 2);
        assert_eq!(text_of(&row.children[0]), vec!["Subtotal"]);
        assert_eq!(text_of(&row.children[1]), vec!["35499.00"]);
        let last = &row.children[1];
        assert!((last.x + last.width - (row.x + row.width)).abs() < 1.0);
    }

    #[test]
    fn blocks_stack_vertically() {
        let boxes = layout("<h1>Invoice</h1><p>one</p><p>two</p>");
        assert_eq!(boxes.len(), 3);
        assert!(boxes[1].y >= boxes[0].y + boxes[0].height);
        assert!(boxes[2].y >= boxes[1].y + boxes[1].height);
    }
}
