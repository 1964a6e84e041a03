//! Style resolver – maps tag defaults, Tailwind-like utility classes and a
//! small set of inline CSS properties to a flat [`ComputedStyle`].
//!
//! Lengths are in PDF points; `px` values are taken as points.

use crate::dom::{DomNode, ElementNode, Tag};

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub justify_content: JustifyContent,
    pub flex_grow: f32,
    pub gap: f32,
    pub width: Dimension,

    pub margin: Sides,
    pub padding: Sides,
    pub border: Sides,
    pub border_color: Color,

    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub uppercase: bool,
    pub color: Color,
    pub text_align: TextAlign,
    /// Multiple of the font size.
    pub line_height: f32,

    pub background_color: Color,

    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            justify_content: JustifyContent::Start,
            flex_grow: 0.0,
            gap: 0.0,
            width: Dimension::Auto,
            margin: Sides::ZERO,
            padding: Sides::ZERO,
            border: Sides::ZERO,
            border_color: Color::GRAY_300,
            font_size: 10.0,
            bold: false,
            italic: false,
            uppercase: false,
            color: Color::GRAY_900,
            text_align: TextAlign::Left,
            line_height: 1.4,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    /// Copy the inherited (text) properties of `parent`.
    fn inherit_from(&mut self, parent: &ComputedStyle) {
        self.font_size = parent.font_size;
        self.bold = parent.bold;
        self.italic = parent.italic;
        self.uppercase = parent.uppercase;
        self.color = parent.color;
        self.text_align = parent.text_align;
        self.line_height = parent.line_height;
    }

    /// Style used for a bare text run: inherited text properties, no box.
    fn text_run(&self) -> Self {
        let mut s = Self::default();
        s.inherit_from(self);
        s.display = Display::Inline;
        s
    }
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Table,
    TableRow,
    TableCell,
    Inline,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

/// Per-side lengths (margin, padding, border widths).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sides {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Sides {
    pub const ZERO: Self = Self::all(0.0);

    pub const fn all(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };
    pub const GRAY_100: Self = Self::rgb(0.953, 0.957, 0.961);
    pub const GRAY_200: Self = Self::rgb(0.898, 0.906, 0.922);
    pub const GRAY_300: Self = Self::rgb(0.831, 0.843, 0.871);
    pub const GRAY_500: Self = Self::rgb(0.424, 0.447, 0.502);
    pub const GRAY_700: Self = Self::rgb(0.216, 0.255, 0.318);
    pub const GRAY_900: Self = Self::rgb(0.067, 0.094, 0.153);

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(hex[0..1].repeat(2).as_str())?,
                channel(hex[1..2].repeat(2).as_str())?,
                channel(hex[2..3].repeat(2).as_str())?,
            )),
            _ => None,
        }
    }

    fn named(name: &str) -> Option<Self> {
        Some(match name {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "gray-100" => Self::GRAY_100,
            "gray-200" => Self::GRAY_200,
            "gray-300" => Self::GRAY_300,
            "gray-500" => Self::GRAY_500,
            "gray-700" => Self::GRAY_700,
            "gray-900" => Self::GRAY_900,
            "blue-50" => Self::rgb(0.937, 0.965, 1.0),
            "blue-700" => Self::rgb(0.114, 0.306, 0.847),
            "blue-900" => Self::rgb(0.118, 0.227, 0.541),
            "green-700" => Self::rgb(0.082, 0.502, 0.239),
            "red-700" => Self::rgb(0.725, 0.110, 0.110),
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its
/// parent.
pub fn resolve_style(element: &ElementNode, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let mut style = ComputedStyle::default();
    if let Some(p) = parent {
        style.inherit_from(p);
    }
    apply_tag_defaults(&mut style, &element.tag);

    for class in element.classes() {
        apply_utility_class(&mut style, class);
    }
    if let Some(inline) = element.inline_style() {
        apply_inline_style(&mut style, inline);
    }
    style
}

fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    match tag {
        Tag::H1 => {
            s.font_size = 22.0;
            s.bold = true;
            s.margin.bottom = 8.0;
        }
        Tag::H2 => {
            s.font_size = 16.0;
            s.bold = true;
            s.margin.bottom = 6.0;
        }
        Tag::H3 => {
            s.font_size = 12.0;
            s.bold = true;
            s.margin.bottom = 4.0;
        }
        Tag::P => s.margin.bottom = 4.0,
        Tag::Hr => {
            s.width = Dimension::Percent(100.0);
            s.border.top = 1.0;
            s.margin.top = 8.0;
            s.margin.bottom = 8.0;
        }
        Tag::Table => {
            s.display = Display::Table;
            s.width = Dimension::Percent(100.0);
        }
        Tag::Tr => s.display = Display::TableRow,
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding = Sides {
                top: 4.0,
                right: 6.0,
                bottom: 4.0,
                left: 6.0,
            };
            if *tag == Tag::Th {
                s.bold = true;
            }
        }
        Tag::Strong => {
            s.display = Display::Inline;
            s.bold = true;
        }
        Tag::Em => {
            s.display = Display::Inline;
            s.italic = true;
        }
        Tag::Small => {
            s.display = Display::Inline;
            s.font_size *= 0.85;
        }
        Tag::Span | Tag::Br => s.display = Display::Inline,
        Tag::Div | Tag::RowGroup | Tag::Body | Tag::Html | Tag::Head | Tag::Unknown(_) => {}
    }
}

/// Apply a single utility class.
fn apply_utility_class(s: &mut ComputedStyle, class: &str) {
    match class {
        "flex" => s.display = Display::Flex,
        "block" => s.display = Display::Block,
        "hidden" => s.display = Display::None,
        "flex-1" | "grow" => s.flex_grow = 1.0,

        "justify-start" => s.justify_content = JustifyContent::Start,
        "justify-end" => s.justify_content = JustifyContent::End,
        "justify-center" => s.justify_content = JustifyContent::Center,
        "justify-between" => s.justify_content = JustifyContent::SpaceBetween,

        "font-bold" | "font-semibold" => s.bold = true,
        "font-normal" => s.bold = false,
        "italic" => s.italic = true,
        "not-italic" => s.italic = false,
        "uppercase" => s.uppercase = true,

        "text-left" => s.text_align = TextAlign::Left,
        "text-center" => s.text_align = TextAlign::Center,
        "text-right" => s.text_align = TextAlign::Right,

        "text-xs" => s.font_size = 8.0,
        "text-sm" => s.font_size = 9.0,
        "text-base" => s.font_size = 10.0,
        "text-lg" => s.font_size = 12.0,
        "text-xl" => s.font_size = 14.0,
        "text-2xl" => s.font_size = 18.0,
        "text-3xl" => s.font_size = 24.0,

        "leading-tight" => s.line_height = 1.2,
        "leading-normal" => s.line_height = 1.4,
        "leading-loose" => s.line_height = 1.8,

        "border" => s.border = Sides::all(1.0),
        "border-t" => s.border.top = 1.0,
        "border-b" => s.border.bottom = 1.0,
        "border-l" => s.border.left = 1.0,
        "border-r" => s.border.right = 1.0,
        "border-0" => s.border = Sides::ZERO,

        "w-full" => s.width = Dimension::Percent(100.0),
        "w-auto" => s.width = Dimension::Auto,
        "w-1/2" => s.width = Dimension::Percent(50.0),
        "w-1/3" => s.width = Dimension::Percent(33.333),
        "w-2/3" => s.width = Dimension::Percent(66.666),
        "w-1/4" => s.width = Dimension::Percent(25.0),
        "w-3/4" => s.width = Dimension::Percent(75.0),

        "break-before" => s.page_break_before = true,
        "break-after" | "page-break" => s.page_break_after = true,
        "break-inside-avoid" => s.page_break_inside_avoid = true,
        _ => {
            try_spacing_class(s, class);
            try_color_class(s, class);
            if let Some(v) = class.strip_prefix("gap-").and_then(|v| v.parse::<f32>().ok()) {
                s.gap = v * 4.0;
            }
        }
    }
}

/// `p-4`, `px-2`, `mb-6`, ... (1 unit = 4 pt).
fn try_spacing_class(s: &mut ComputedStyle, class: &str) {
    let Some((prefix, value)) = class.rsplit_once('-') else {
        return;
    };
    let Ok(units) = value.parse::<f32>() else {
        return;
    };
    let v = units * 4.0;
    let (sides, edges) = match prefix {
        "p" | "px" | "py" | "pt" | "pr" | "pb" | "pl" => (&mut s.padding, &prefix[1..]),
        "m" | "mx" | "my" | "mt" | "mr" | "mb" | "ml" => (&mut s.margin, &prefix[1..]),
        _ => return,
    };
    match edges {
        "" => *sides = Sides::all(v),
        "x" => {
            sides.left = v;
            sides.right = v;
        }
        "y" => {
            sides.top = v;
            sides.bottom = v;
        }
        "t" => sides.top = v,
        "r" => sides.right = v,
        "b" => sides.bottom = v,
        "l" => sides.left = v,
        _ => {}
    }
}

/// `text-gray-500`, `bg-gray-100`, `border-gray-300`.
fn try_color_class(s: &mut ComputedStyle, class: &str) {
    if let Some(c) = class.strip_prefix("text-").and_then(Color::named) {
        s.color = c;
    } else if let Some(c) = class.strip_prefix("bg-").and_then(Color::named) {
        s.background_color = c;
    } else if let Some(c) = class.strip_prefix("border-").and_then(Color::named) {
        s.border_color = c;
    }
}

// ---------------------------------------------------------------------------
// Inline style parsing (limited subset)
// ---------------------------------------------------------------------------

fn apply_inline_style(s: &mut ComputedStyle, style_str: &str) {
    for decl in style_str.split(';') {
        if let Some((prop, val)) = decl.split_once(':') {
            apply_css_property(s, prop.trim(), val.trim());
        }
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    match prop {
        "display" => match val {
            "flex" => s.display = Display::Flex,
            "block" => s.display = Display::Block,
            "none" => s.display = Display::None,
            _ => {}
        },
        "font-size" => {
            if let Some(v) = parse_length(val) {
                s.font_size = v;
            }
        }
        "font-weight" => s.bold = matches!(val, "bold" | "bolder" | "600" | "700" | "800" | "900"),
        "font-style" => s.italic = val == "italic",
        "text-transform" => s.uppercase = val == "uppercase",
        "text-align" => match val {
            "left" => s.text_align = TextAlign::Left,
            "center" => s.text_align = TextAlign::Center,
            "right" => s.text_align = TextAlign::Right,
            _ => {}
        },
        "line-height" => {
            if let Ok(v) = val.parse::<f32>() {
                s.line_height = v;
            }
        }
        "color" => {
            if let Some(c) = parse_color(val) {
                s.color = c;
            }
        }
        "background" | "background-color" => {
            if let Some(c) = parse_color(val) {
                s.background_color = c;
            }
        }
        "width" => s.width = parse_dimension(val),
        "margin" => apply_shorthand(&mut s.margin, val),
        "padding" => apply_shorthand(&mut s.padding, val),
        "margin-top" | "margin-right" | "margin-bottom" | "margin-left" => {
            set_side(&mut s.margin, &prop["margin-".len()..], val)
        }
        "padding-top" | "padding-right" | "padding-bottom" | "padding-left" => {
            set_side(&mut s.padding, &prop["padding-".len()..], val)
        }
        "border" => {
            let (w, c) = parse_border(val);
            s.border = Sides::all(w);
            if let Some(c) = c {
                s.border_color = c;
            }
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let (w, c) = parse_border(val);
            set_side_value(&mut s.border, &prop["border-".len()..], w);
            if let Some(c) = c {
                s.border_color = c;
            }
        }
        "border-color" => {
            if let Some(c) = parse_color(val) {
                s.border_color = c;
            }
        }
        "page-break-before" | "break-before" => s.page_break_before = val != "auto",
        "page-break-after" | "break-after" => s.page_break_after = val != "auto",
        "page-break-inside" | "break-inside" => s.page_break_inside_avoid = val == "avoid",
        _ => log::trace!("ignoring css property {prop}: {val}"),
    }
}

fn parse_length(val: &str) -> Option<f32> {
    let val = val.trim();
    let (num, scale) = if let Some(n) = val.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = val.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = val.strip_suffix("em") {
        (n, 10.0)
    } else {
        (val, 1.0)
    };
    num.trim().parse::<f32>().ok().map(|v| v * scale)
}

fn parse_dimension(val: &str) -> Dimension {
    let val = val.trim();
    if let Some(p) = val.strip_suffix('%') {
        p.trim().parse().map(Dimension::Percent).unwrap_or(Dimension::Auto)
    } else {
        parse_length(val).map(Dimension::Px).unwrap_or(Dimension::Auto)
    }
}

fn parse_color(val: &str) -> Option<Color> {
    if val.starts_with('#') {
        Color::from_hex(val)
    } else {
        Color::named(val)
    }
}

/// `1px solid #ccc` → (1.0, Some(#ccc)).
fn parse_border(val: &str) -> (f32, Option<Color>) {
    if val == "none" || val == "0" {
        return (0.0, None);
    }
    let mut width = 1.0;
    let mut color = None;
    for part in val.split_whitespace() {
        if let Some(w) = parse_length(part) {
            width = w;
        } else if let Some(c) = parse_color(part) {
            color = Some(c);
        }
    }
    (width, color)
}

fn set_side(sides: &mut Sides, side: &str, val: &str) {
    if let Some(v) = parse_length(val) {
        set_side_value(sides, side, v);
    }
}

fn set_side_value(sides: &mut Sides, side: &str, v: f32) {
    match side {
        "top" => sides.top = v,
        "right" => sides.right = v,
        "bottom" => sides.bottom = v,
        "left" => sides.left = v,
        _ => {}
    }
}

fn apply_shorthand(sides: &mut Sides, val: &str) {
    let parts: Vec<f32> = val.split_whitespace().filter_map(parse_length).collect();
    match parts[..] {
        [a] => *sides = Sides::all(a),
        [v, h] => {
            *sides = Sides {
                top: v,
                right: h,
                bottom: v,
                left: h,
            }
        }
        [t, h, b] => {
            *sides = Sides {
                top: t,
                right: h,
                bottom: b,
                left: h,
            }
        }
        [t, r, b, l] => {
            *sides = Sides {
                top: t,
                right: r,
                bottom: b,
                left: l,
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Columns spanned when the element is a table cell.
        colspan: usize,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn is_inline(&self) -> bool {
        match self {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                style, children, ..
            } => style.display == Display::Inline && children.iter().all(StyledNode::is_inline),
        }
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
///
/// Row groups (thead/tbody/tfoot) are dissolved into their table and
/// `display: none` subtrees are dropped.
pub fn build_styled_tree(
    nodes: &[DomNode],
    parent_style: Option<&ComputedStyle>,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, Some(&style));
                if e.tag == Tag::RowGroup {
                    result.extend(children);
                    continue;
                }
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    colspan: e.colspan(),
                });
            }
            DomNode::Text(text) => {
                let style = parent_style
                    .map(ComputedStyle::text_run)
                    .unwrap_or_default();
                result.push(StyledNode::Text {
                    text: text.clone(),
                    style,
                });
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn utility_padding() {
        let mut s = ComputedStyle::default();
        apply_utility_class(&mut s, "p-4");
        assert_eq!(s.padding, Sides::all(16.0));
        apply_utility_class(&mut s, "mb-2");
        assert_eq!(s.margin.bottom, 8.0);
        assert_eq!(s.margin.top, 0.0);
    }

    #[test]
    fn inline_style_font_and_border() {
        let mut s = ComputedStyle::default();
        apply_inline_style(&mut s, "font-size: 24px; color: #ff0000; border-bottom: 2px solid #000");
        assert_eq!(s.font_size, 24.0);
        assert!((s.color.r - 1.0).abs() < 0.01);
        assert_eq!(s.border.bottom, 2.0);
        assert_eq!(s.border.top, 0.0);
        assert_eq!(s.border_color, Color::BLACK);
    }

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex("#ff8800").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
    }

    #[test]
    fn text_properties_inherit() {
        let dom = parse_html(r#"<div class="text-right font-bold"><p>x</p></div>"#);
        let styled = build_styled_tree(&dom, None);
        let StyledNode::Element { children, .. } = &styled[0] else {
            panic!("expected element");
        };
        let StyledNode::Element { style, .. } = &children[0] else {
            panic!("expected element");
        };
        assert_eq!(style.text_align, TextAlign::Right);
        assert!(style.bold);
        assert!(style.padding.is_zero());
    }

    #[test]
    fn row_groups_dissolve_into_table() {
        let dom = parse_html("<table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>");
        let styled = build_styled_tree(&dom, None);
        let StyledNode::Element { children, .. } = &styled[0] else {
            panic!("expected table");
        };
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| matches!(
            c,
            StyledNode::Element { tag: Tag::Tr, .. }
        )));
    }

    #[test]
    fn hidden_elements_are_dropped() {
        let dom = parse_html(r#"<p class="hidden">a</p><p style="display: none">b</p><p>c</p>"#);
        assert_eq!(build_styled_tree(&dom, None).len(), 1);
    }
}
