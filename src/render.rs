//! PDF painter – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API) and the built-in Helvetica faces.

use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage,
    PdfSaveOptions, Point, Polygon, PolygonRing, Pt, Rgb, TextItem, WindingOrder,
};

use crate::layout_config::{LayoutBox, LayoutConfig, TextContent};

const PT_TO_MM: f32 = 0.352_778;

/// Paint a LayoutConfig into PDF bytes.
pub fn render_pdf(config: &LayoutConfig) -> Vec<u8> {
    let page_w = Mm(config.page_width_pt * PT_TO_MM);
    let page_h = Mm(config.page_height_pt * PT_TO_MM);

    let mut painter = Painter {
        ops: Vec::new(),
        page_height: config.page_height_pt,
        substituted: 0,
    };
    let mut pages = Vec::with_capacity(config.pages.len().max(1));
    for page_layout in &config.pages {
        for lbox in &page_layout.boxes {
            painter.paint_box(lbox);
        }
        pages.push(PdfPage::new(page_w, page_h, std::mem::take(&mut painter.ops)));
    }
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }
    if painter.substituted > 0 {
        log::warn!(
            "{} character(s) have no glyph in the built-in fonts and were replaced",
            painter.substituted
        );
    }

    let mut doc = PdfDocument::new(&config.title);
    doc.with_pages(pages);
    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    log::debug!(
        "encoded {} page(s), {} bytes, {} printpdf warning(s)",
        config.pages.len().max(1),
        bytes.len(),
        warnings.len()
    );
    bytes
}

fn rgb(c: [f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Map text onto the printable ASCII range the built-in fonts encode
/// unambiguously. Typographic punctuation gets its plain equivalent; the
/// number of characters that had to become `?` is added to `substituted`.
fn to_builtin_text(s: &str, substituted: &mut usize) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' '..='~' => out.push(c),
            '\u{00A0}' | '\t' => out.push(' '),
            '\u{2018}' | '\u{2019}' | '\u{201A}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{00B7}' => out.push('*'),
            '\u{2026}' => out.push_str("..."),
            '\u{2192}' => out.push_str("->"),
            '\u{20AC}' => out.push_str("EUR"),
            '\u{20B9}' => out.push_str("Rs."),
            '\u{00A9}' => out.push_str("(c)"),
            _ => {
                *substituted += 1;
                out.push('?');
            }
        }
    }
    out
}

struct Painter {
    ops: Vec<Op>,
    /// PDF origin is bottom-left; layout origin is top-left.
    page_height: f32,
    substituted: usize,
}

impl Painter {
    fn paint_box(&mut self, lbox: &LayoutBox) {
        let top = self.page_height - lbox.y;
        let bottom = top - lbox.height;
        let (left, right) = (lbox.x, lbox.x + lbox.width);

        if let Some(bg) = lbox.background_color {
            self.ops.push(Op::SetFillColor { col: rgb(bg) });
            self.ops.push(Op::DrawPolygon {
                polygon: Polygon {
                    rings: vec![PolygonRing {
                        points: vec![
                            point(left, bottom),
                            point(right, bottom),
                            point(right, top),
                            point(left, top),
                        ],
                    }],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                },
            });
        }

        if let Some(border) = &lbox.border {
            self.ops.push(Op::SetOutlineColor {
                col: rgb(border.color),
            });
            // Each stroke runs through the middle of its border band.
            let sides = [
                (border.top, (left, top - border.top / 2.0), (right, top - border.top / 2.0)),
                (
                    border.bottom,
                    (left, bottom + border.bottom / 2.0),
                    (right, bottom + border.bottom / 2.0),
                ),
                (border.left, (left + border.left / 2.0, bottom), (left + border.left / 2.0, top)),
                (
                    border.right,
                    (right - border.right / 2.0, bottom),
                    (right - border.right / 2.0, top),
                ),
            ];
            for (width, from, to) in sides {
                if width <= 0.0 {
                    continue;
                }
                self.ops.push(Op::SetOutlineThickness { pt: Pt(width) });
                self.ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![point(from.0, from.1), point(to.0, to.1)],
                        is_closed: false,
                    },
                });
            }
        }

        if let Some(text) = &lbox.text {
            self.paint_text(lbox, text, top);
        }

        for child in &lbox.children {
            self.paint_box(child);
        }
    }

    fn paint_text(&mut self, lbox: &LayoutBox, text: &TextContent, top: f32) {
        let font = match (text.bold, text.italic) {
            (true, true) => BuiltinFont::HelveticaBoldOblique,
            (true, false) => BuiltinFont::HelveticaBold,
            (false, true) => BuiltinFont::HelveticaOblique,
            (false, false) => BuiltinFont::Helvetica,
        };

        for (i, line) in text.lines.iter().enumerate() {
            if line.text.is_empty() {
                continue;
            }
            let baseline = top - text.baseline - i as f32 * text.line_height;
            let encoded = to_builtin_text(&line.text, &mut self.substituted);

            self.ops.push(Op::StartTextSection);
            self.ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(lbox.x + line.x_offset),
                    y: Pt(baseline),
                },
            });
            self.ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(text.font_size),
                font,
            });
            self.ops.push(Op::SetLineHeight {
                lh: Pt(text.line_height),
            });
            self.ops.push(Op::SetFillColor {
                col: rgb(text.color),
            });
            self.ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(encoded)],
                font,
            });
            self.ops.push(Op::EndTextSection);
        }
    }
}
