//! invoice-forge – render an invoice to PDF.
//!
//! Usage:
//!   invoice-forge [--data invoice.json] [--template invoice.html] [--output invoice.pdf]
//!                 [--title "Invoice 42"] [--landscape] [--emit-html rendered.html]
//!
//! Without `--data` the built-in demo invoice is used. Without `--template`
//! `templates/invoice.html` is used when present, else the bundled template.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use invoice_forge::pipeline::DEFAULT_OUTPUT;
use invoice_forge::{
    ConsoleReporter, FsProbe, Orientation, PageSetup, PdfExporter, Pipeline, PipelineConfig,
    TeraRenderer,
};

const RULE: &str = "=================================================";

#[derive(Debug, Parser)]
#[command(name = "invoice-forge", version, about = "Render invoice data into a PDF")]
struct Cli {
    /// JSON invoice data file (default: built-in demo invoice)
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// Markup template (default: templates/invoice.html, then the bundled one)
    #[arg(long, value_name = "PATH")]
    template: Option<PathBuf>,

    /// Destination PDF
    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// PDF metadata title (default: the template's <title>)
    #[arg(long)]
    title: Option<String>,

    /// Landscape page orientation
    #[arg(long)]
    landscape: bool,

    /// Also write the rendered markup to this file
    #[arg(long, value_name = "PATH")]
    emit_html: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    println!("{RULE}");
    println!("  invoice-forge {}", env!("CARGO_PKG_VERSION"));
    println!("{RULE}");

    let setup = PageSetup {
        title: cli.title,
        orientation: if cli.landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        },
        ..PageSetup::default()
    };
    let config = PipelineConfig {
        data: cli.data,
        template: cli.template,
        output: cli.output,
        emit_html: cli.emit_html,
        ..PipelineConfig::default()
    };

    let pipeline = Pipeline::new(
        config,
        TeraRenderer::default(),
        PdfExporter::new(setup),
        &FsProbe,
    );
    match pipeline.run(&mut ConsoleReporter) {
        Ok(report) => {
            println!("{RULE}");
            log::info!(
                "wrote '{}' ({} bytes) for {}",
                report.output.display(),
                report.bytes_written,
                report.invoice_number
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
