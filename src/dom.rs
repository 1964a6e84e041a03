//! Markup parser – converts rendered invoice HTML into a small DOM tree.
//!
//! The supported subset is what invoice templates need:
//! - Block: div, p, h1-h3, hr, table, thead, tbody, tfoot, tr, td, th
//! - Inline: span, strong, b, em, i, small, br
//! - Styling via `class` and `style` attributes
//!
//! `<head>`, `<style>`, `<script>` and `<title>` contents are skipped.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    Hr,
    Table,
    /// thead / tbody / tfoot – row groups are flattened into their table.
    RowGroup,
    Tr,
    Td,
    Th,
    Span,
    Strong,
    Em,
    Small,
    Br,
    Body,
    Html,
    Head,
    /// Catch-all for unknown tags – kept and treated as divs.
    Unknown(String),
}

impl Tag {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" | "section" | "header" | "footer" | "main" | "article" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" | "h4" | "h5" | "h6" => Tag::H3,
            "hr" => Tag::Hr,
            "table" => Tag::Table,
            "thead" | "tbody" | "tfoot" => Tag::RowGroup,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" | "a" | "label" => Tag::Span,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "small" => Tag::Small,
            "br" => Tag::Br,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            other => Tag::Unknown(other.to_string()),
        }
    }
}

/// Elements that never have children or a closing tag.
fn is_void(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "br" | "hr" | "img" | "meta" | "link" | "input" | "col"
    )
}

/// Elements whose text content is not rendered.
fn is_raw_text(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "style" | "script" | "title"
    )
}

#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    /// `colspan` attribute, at least 1.
    pub fn colspan(&self) -> usize {
        self.attributes
            .get("colspan")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(1usize)
            .max(1)
    }
}

// ---------------------------------------------------------------------------
// Parser – recursive descent over the controlled subset
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_between_tags();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            self.skip_past(">");
            return None;
        }
        if self.starts_with("<") {
            self.parse_element()
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        self.pos = self.input[start..]
            .find('<')
            .map_or(self.input.len(), |i| start + i);
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> Option<DomNode> {
        self.pos += 1; // '<'
        let name = self.parse_name();
        let mut elem = ElementNode::new(Tag::parse(&name));

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Stray character inside the tag.
                self.advance_char();
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return Some(DomNode::Element(elem));
        }
        if self.starts_with(">") {
            self.pos += 1;
        }
        if is_void(&name) {
            return Some(DomNode::Element(elem));
        }
        if is_raw_text(&name) {
            self.skip_past(&format!("</{}", name.to_ascii_lowercase()));
            self.skip_past(">");
            return None;
        }

        elem.children = self.parse_nodes();

        if self.starts_with("</") {
            self.pos += 2;
            self.parse_name();
            self.skip_past(">");
        }

        if elem.tag == Tag::Head {
            return None;
        }
        Some(DomNode::Element(elem))
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance_char();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        let quote = match self.current_char() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                let start = self.pos;
                while let Some(c) = self.current_char() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    self.advance_char();
                }
                return decode_entities(&self.input[start..self.pos]);
            }
        };
        self.pos += 1;
        let start = self.pos;
        let end = self.input[start..]
            .find(quote)
            .map_or(self.input.len(), |i| start + i);
        let value = decode_entities(&self.input[start..end]);
        self.pos = (end + 1).min(self.input.len());
        value
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance_char();
        }
    }

    /// Skip runs of pure whitespace between tags; whitespace that leads into
    /// text is kept.
    fn skip_whitespace_between_tags(&mut self) {
        let saved = self.pos;
        self.skip_whitespace();
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    /// Move past the next occurrence of `marker` (or to the end).
    fn skip_past(&mut self, marker: &str) {
        let rest = &self.input[self.pos..];
        let lower = rest.to_ascii_lowercase();
        self.pos += lower.find(marker).map_or(rest.len(), |i| i + marker.len());
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
        }
    }
}

/// Decode named and numeric character references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "bull" => '\u{2022}',
        "hellip" => '\u{2026}',
        "copy" => '\u{00A9}',
        "euro" => '\u{20AC}',
        "rarr" => '\u{2192}',
        _ => return None,
    })
}

/// Text of the first `<title>` element, if any and non-blank.
pub fn document_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;
    let title = decode_entities(html[start..end].trim());
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

/// Find the `<body>` element and return its children, or all nodes if no
/// `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}
