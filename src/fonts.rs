//! Text metrics for the PDF standard Helvetica faces.
//!
//! Widths come from the Adobe core-font metrics (units per 1000 em) for the
//! printable ASCII range. Oblique faces share the upright widths. Anything
//! outside the table is measured as a digit-width glyph.

/// Helvetica ascender, per 1000 em.
const ASCENDER: f32 = 718.0;
const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,      // p..~
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn glyph_width(c: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match c {
        ' '..='~' => table[c as usize - 0x20],
        '\u{2014}' => 1000,
        '\u{00a0}' => table[0],
        _ => FALLBACK_WIDTH,
    }
}

/// Width of `text` in points at `font_size`.
pub fn text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(c, bold))).sum();
    units as f32 * font_size / 1000.0
}

pub fn line_height(font_size: f32, factor: f32) -> f32 {
    font_size * factor
}

/// Distance from the top of a line box to the baseline.
pub fn baseline_offset(font_size: f32, factor: f32) -> f32 {
    let leading = line_height(font_size, factor) - font_size;
    leading / 2.0 + ASCENDER * font_size / 1000.0
}

/// Greedy word wrap. Explicit `\n` always starts a new line; a single word
/// wider than `max_width` gets a line of its own.
pub fn wrap_text(text: &str, font_size: f32, bold: bool, max_width: f32) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if text_width(&candidate, font_size, bold) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_from_afm_widths() {
        // H e l l o = 722 + 556 + 222 + 222 + 556
        assert!((text_width("Hello", 10.0, false) - 22.78).abs() < 0.001);
        assert!(text_width("Hello", 10.0, true) > text_width("Hello", 10.0, false));
        assert_eq!(text_width("", 12.0, false), 0.0);
    }

    #[test]
    fn digits_are_tabular() {
        assert_eq!(
            text_width("41888.82", 10.0, false),
            text_width("00000.00", 10.0, false)
        );
    }

    #[test]
    fn word_wrap_basic() {
        let lines = wrap_text("the quick brown fox jumps over", 10.0, false, 60.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 10.0, false) <= 60.0 || !line.contains(' '));
        }
        assert_eq!(lines.join(" "), "the quick brown fox jumps over");
    }

    #[test]
    fn explicit_breaks_are_kept() {
        let lines = wrap_text("Pune\nIndia", 10.0, false, 500.0);
        assert_eq!(lines, vec!["Pune", "India"]);
    }
}
