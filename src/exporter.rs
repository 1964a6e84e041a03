//! Exporter capability: markup text → PDF bytes on a caller-owned stream.

use std::io::Write;

use crate::dom::{body_children, document_title, parse_html};
use crate::error::ExportError;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::pagination::paginate;
use crate::render::render_pdf;
use crate::style::build_styled_tree;

/// Converts markup into an encoded document written to `sink`.
///
/// The sink is owned by the caller, who flushes and closes it whatever the
/// outcome.
pub trait Exporter {
    fn export(&self, markup: &str, sink: &mut dyn Write) -> Result<(), ExportError>;
}

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    /// Width and height swapped.
    Landscape,
}

/// Physical page description.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    /// PDF metadata title. `None` takes the markup's `<title>`.
    pub title: Option<String>,
    /// Portrait page width in points (default: A4 = 595.28).
    pub page_width: f32,
    /// Portrait page height in points (default: A4 = 841.89).
    pub page_height: f32,
    pub page_margin: f32,
    pub orientation: Orientation,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            title: None,
            page_width: 595.28,
            page_height: 841.89,
            page_margin: 40.0,
            orientation: Orientation::Portrait,
        }
    }
}

impl PageSetup {
    pub fn effective_width(&self) -> f32 {
        match self.orientation {
            Orientation::Portrait => self.page_width,
            Orientation::Landscape => self.page_height,
        }
    }

    pub fn effective_height(&self) -> f32 {
        match self.orientation {
            Orientation::Portrait => self.page_height,
            Orientation::Landscape => self.page_width,
        }
    }
}

const FALLBACK_TITLE: &str = "Invoice";

/// Built-in HTML → PDF engine.
#[derive(Debug, Clone, Default)]
pub struct PdfExporter {
    pub setup: PageSetup,
}

impl PdfExporter {
    pub fn new(setup: PageSetup) -> Self {
        Self { setup }
    }

    /// Parse, style, lay out and paginate `markup` without encoding it.
    pub fn layout(&self, markup: &str) -> Result<LayoutConfig, ExportError> {
        let dom = parse_html(markup);
        let styled = build_styled_tree(&body_children(&dom), None);

        let width = self.setup.effective_width();
        let height = self.setup.effective_height();
        let margin = self.setup.page_margin;
        if width <= 2.0 * margin || height <= 2.0 * margin {
            return Err(ExportError::Layout(format!(
                "page {width}x{height} pt leaves no room inside {margin} pt margins"
            )));
        }

        let title = self
            .setup
            .title
            .clone()
            .or_else(|| document_title(markup))
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());

        let boxes = compute_layout(&styled, width, margin)?;
        let config = paginate(&boxes, &title, width, height, margin);
        log::debug!("laid out {} page(s) titled {:?}", config.pages.len(), config.title);
        log::trace!("layout: {}", config.to_json());
        Ok(config)
    }
}

impl Exporter for PdfExporter {
    fn export(&self, markup: &str, sink: &mut dyn Write) -> Result<(), ExportError> {
        let config = self.layout(markup)?;
        let bytes = render_pdf(&config);
        if !bytes.starts_with(b"%PDF-") {
            return Err(ExportError::Pdf("encoder produced no PDF header".into()));
        }
        sink.write_all(&bytes)?;
        Ok(())
    }
}
