//! Integration tests for the invoice-forge pipeline.
//!
//! These tests validate:
//! - the resolution chain against a real filesystem
//! - totals as they reach the rendered markup
//! - PDF output exists and has a valid format
//! - rendering and layout are deterministic
//! - pagination of long invoices

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use invoice_forge::context::RenderContext;
use invoice_forge::error::{ConfigIssue, ForgeError, Stage};
use invoice_forge::invoice::{round_half_up, TAX_RATE};
use invoice_forge::layout_config::LayoutBox;
use invoice_forge::pipeline::{Event, RunReport};
use invoice_forge::resolve::{DataSource, TemplateSource};
use invoice_forge::sources::BUNDLED_TEMPLATE;
use invoice_forge::{
    FsProbe, Invoice, LineItem, Party, PdfExporter, Pipeline, PipelineConfig, Renderer,
    Reporter, TeraRenderer,
};

// =====================================================================
// Helpers
// =====================================================================

struct Quiet;

impl Reporter for Quiet {
    fn report(&mut self, _: &Event<'_>) {}
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn config_in(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        output: dir.join("out").join("invoice.pdf"),
        external_template: dir.join("templates").join("invoice.html"),
        ..PipelineConfig::default()
    }
}

fn run(config: PipelineConfig) -> Result<RunReport, ForgeError> {
    Pipeline::new(config, TeraRenderer::default(), PdfExporter::default(), &FsProbe)
        .run(&mut Quiet)
}

fn write(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
    path.to_path_buf()
}

const TWO_ITEMS: &str = r#"{
  "invoiceNumber": "INV-7",
  "invoiceDate": "2026-01-05",
  "dueDate": "2026-01-20",
  "companyName": "Acme Storage",
  "companyAddress": "1 Dock Road",
  "companyEmail": "billing@acme.test",
  "customerName": "Globex",
  "customerEmail": "ap@globex.test",
  "customerAddress": "9 Main Street",
  "items": [
    { "description": "Storage", "quantity": 20, "unitPrice": "850.00" },
    { "description": "Handling", "quantity": 3, "unitPrice": "2500.00" }
  ]
}"#;

const TOTALS_TEMPLATE: &str =
    "{{ invoice.subtotal }}|{{ invoice.tax }}|{{ invoice.grandTotal }}";

fn visit_box<'a>(lbox: &'a LayoutBox, out: &mut Vec<&'a str>) {
    if let Some(text) = &lbox.text {
        out.extend(text.lines.iter().map(|l| l.text.as_str()));
    }
    for child in &lbox.children {
        visit_box(child, out);
    }
}

fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn render_sample() -> String {
    let ctx = RenderContext::bind(&Invoice::sample()).unwrap();
    TeraRenderer::default().render(BUNDLED_TEMPLATE, &ctx).unwrap()
}

// =====================================================================
// End-to-end runs
// =====================================================================

#[test]
fn sample_invoice_renders_to_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let report = run(config_in(dir.path())).unwrap();

    assert_eq!(report.data, DataSource::Sample);
    assert_eq!(report.template, TemplateSource::Bundled);
    assert!(report.output.is_absolute());
    let bytes = fs::read(&report.output).unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(report.bytes_written, bytes.len() as u64);
}

#[test]
fn external_template_beats_bundled() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write(&config.external_template, "<p>{{ invoice.invoiceNumber }}</p>");
    let html = dir.path().join("rendered.html");

    let report = run(PipelineConfig {
        emit_html: Some(html.clone()),
        ..config
    })
    .unwrap();

    assert!(matches!(report.template, TemplateSource::External(_)));
    assert_eq!(fs::read_to_string(html).unwrap(), "<p>INV-2026-0042</p>");
}

#[test]
fn explicit_template_beats_external() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write(&config.external_template, "<p>external</p>");
    let explicit = write(&dir.path().join("mine.html"), "<p>explicit</p>");
    let html = dir.path().join("rendered.html");

    let report = run(PipelineConfig {
        template: Some(explicit.clone()),
        emit_html: Some(html.clone()),
        ..config
    })
    .unwrap();

    assert_eq!(report.template, TemplateSource::Explicit(explicit));
    assert_eq!(fs::read_to_string(html).unwrap(), "<p>explicit</p>");
}

#[test]
fn data_file_totals_reach_the_template() {
    let dir = tempfile::tempdir().unwrap();
    let data = write(&dir.path().join("invoice.json"), TWO_ITEMS);
    let template = write(&dir.path().join("totals.html"), TOTALS_TEMPLATE);
    let html = dir.path().join("rendered.html");

    let report = run(PipelineConfig {
        data: Some(data.clone()),
        template: Some(template),
        emit_html: Some(html.clone()),
        ..config_in(dir.path())
    })
    .unwrap();

    assert_eq!(report.data, DataSource::File(data));
    assert_eq!(report.invoice_number, "INV-7");
    assert_eq!(
        fs::read_to_string(html).unwrap(),
        "24500.00|4410.00|28910.00"
    );
}

#[test]
fn empty_invoice_totals_are_zero() {
    let dir = tempfile::tempdir().unwrap();
    let json = TWO_ITEMS
        .split("\"items\"")
        .next()
        .unwrap()
        .trim_end()
        .trim_end_matches(',')
        .to_string()
        + "\n}";
    let data = write(&dir.path().join("empty.json"), &json);
    let template = write(&dir.path().join("totals.html"), TOTALS_TEMPLATE);
    let html = dir.path().join("rendered.html");

    run(PipelineConfig {
        data: Some(data),
        template: Some(template),
        emit_html: Some(html.clone()),
        ..config_in(dir.path())
    })
    .unwrap();

    assert_eq!(fs::read_to_string(html).unwrap(), "0.00|0.00|0.00");
}

#[test]
fn missing_data_file_aborts_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        data: Some(dir.path().join("nope.json")),
        ..config_in(dir.path())
    };
    let output = config.output.clone();

    let err = run(config).unwrap_err();
    assert_eq!(err.stage(), Stage::Data);
    assert!(err.to_string().contains("data file not found"));
    assert!(err.to_string().contains("nope.json"));
    assert!(!output.exists());
}

#[test]
fn unknown_fields_are_malformed_data() {
    let dir = tempfile::tempdir().unwrap();
    let json = TWO_ITEMS.replacen('{', "{\n  \"discount\": \"5\",", 1);
    let data = write(&dir.path().join("invoice.json"), &json);

    let err = run(PipelineConfig {
        data: Some(data),
        ..config_in(dir.path())
    })
    .unwrap_err();
    assert!(matches!(
        err,
        ForgeError::Configuration {
            issue: ConfigIssue::MalformedData(_),
            ..
        }
    ));
}

#[test]
fn overflowing_amounts_are_malformed_data() {
    let dir = tempfile::tempdir().unwrap();
    let data = write(
        &dir.path().join("huge.json"),
        &TWO_ITEMS.replace("\"850.00\"", "\"79228162514264337593543950335\""),
    );
    let config = config_in(dir.path());
    let output = config.output.clone();
    let err = run(PipelineConfig {
        data: Some(data),
        ..config
    })
    .unwrap_err();
    assert!(matches!(
        err,
        ForgeError::Configuration {
            issue: ConfigIssue::MalformedData(_),
            ..
        }
    ));
    assert_eq!(err.stage(), Stage::Data);
    assert!(!output.exists());
}

#[test]
fn broken_template_is_a_template_error() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(&dir.path().join("bad.html"), "{% for x in %}");
    let err = run(PipelineConfig {
        template: Some(template),
        ..config_in(dir.path())
    })
    .unwrap_err();
    assert_eq!(err.stage(), Stage::Template);
    assert!(matches!(err, ForgeError::Render(_)));
}

// =====================================================================
// Bundled template and layout
// =====================================================================

#[test]
fn rendering_is_idempotent() {
    assert_eq!(
        sha256_hex(render_sample().as_bytes()),
        sha256_hex(render_sample().as_bytes())
    );
}

#[test]
fn bundled_template_lists_items_in_order() {
    let markup = render_sample();
    let positions: Vec<usize> = Invoice::sample()
        .items()
        .iter()
        .map(|item| {
            let escaped = tera::escape_html(item.description());
            markup
                .find(&escaped)
                .unwrap_or_else(|| panic!("{escaped} missing from markup"))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(markup.contains("41888.82"));
    assert!(markup.contains("<title>Invoice INV-2026-0042</title>"));
}

#[test]
fn bundled_layout_fits_one_page_and_shows_totals() {
    let layout = PdfExporter::default().layout(&render_sample()).unwrap();
    assert_eq!(layout.pages.len(), 1);
    assert_eq!(layout.title, "Invoice INV-2026-0042");

    let mut texts = Vec::new();
    for b in &layout.pages[0].boxes {
        visit_box(b, &mut texts);
    }
    for expected in ["INV-2026-0042", "35499.00", "6389.82", "41888.82", "Grand total"] {
        assert!(
            texts.iter().any(|t| t.contains(expected)),
            "{expected} missing from {texts:?}"
        );
    }
}

#[test]
fn layout_is_deterministic() {
    let markup = render_sample();
    let a = PdfExporter::default().layout(&markup).unwrap().to_json();
    let b = PdfExporter::default().layout(&markup).unwrap().to_json();
    assert_eq!(sha256_hex(a.as_bytes()), sha256_hex(b.as_bytes()));
}

#[test]
fn long_invoices_span_pages() {
    let items = (0..150)
        .map(|i| LineItem::new(format!("Pallet slot {i}"), 1, Decimal::new(1000, 2)).unwrap())
        .collect();
    let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let invoice = Invoice::new(
        "INV-LONG",
        date,
        date,
        Party::default(),
        Party::default(),
        items,
        None,
    )
    .unwrap();
    let ctx = RenderContext::bind(&invoice).unwrap();
    let markup = TeraRenderer::default().render(BUNDLED_TEMPLATE, &ctx).unwrap();
    let layout = PdfExporter::default().layout(&markup).unwrap();
    assert!(layout.pages.len() > 1, "got {} page(s)", layout.pages.len());
    for page in &layout.pages {
        for b in &page.boxes {
            assert!(b.y + b.height <= layout.page_height_pt - 40.0 + 0.01);
        }
    }
}

// =====================================================================
// Totals properties
// =====================================================================

fn items_strategy() -> impl Strategy<Value = Vec<LineItem>> {
    prop::collection::vec((0u32..500, 0i64..5_000_000, 0u32..=3), 0..12).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (qty, mantissa, scale))| {
                LineItem::new(format!("item {i}"), qty, Decimal::new(mantissa, scale)).unwrap()
            })
            .collect()
    })
}

fn invoice_with(items: Vec<LineItem>) -> Invoice {
    let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    Invoice::new("P", date, date, Party::default(), Party::default(), items, None).unwrap()
}

fn cent_items_strategy() -> impl Strategy<Value = Vec<LineItem>> {
    prop::collection::vec((0u32..500, 0i64..5_000_000, 0u32..=2), 0..12).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (qty, mantissa, scale))| {
                LineItem::new(format!("item {i}"), qty, Decimal::new(mantissa, scale)).unwrap()
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn subtotal_is_exact_sum(items in items_strategy()) {
        let expected: Decimal = items
            .iter()
            .map(|i| Decimal::from(i.quantity()) * i.unit_price())
            .sum();
        prop_assert_eq!(invoice_with(items).subtotal(), expected);
    }

    #[test]
    fn totals_follow_two_stage_rounding(items in items_strategy()) {
        let inv = invoice_with(items);
        let subtotal = inv.subtotal();
        prop_assert_eq!(inv.tax(), round_half_up(subtotal * TAX_RATE));
        prop_assert_eq!(inv.grand_total(), round_half_up(subtotal + inv.tax()));
        prop_assert!(subtotal >= Decimal::ZERO);
        prop_assert!(inv.grand_total() >= round_half_up(subtotal));
    }

    #[test]
    fn grand_total_never_below_cent_subtotal(items in cent_items_strategy()) {
        let inv = invoice_with(items);
        prop_assert!(inv.subtotal() >= Decimal::ZERO);
        prop_assert!(inv.grand_total() >= inv.subtotal());
    }
}
