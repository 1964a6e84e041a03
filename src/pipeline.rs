//! Pipeline – resolve the inputs, load them, render the template and export
//! the result, reporting each step as it completes.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::context::RenderContext;
use crate::error::{ForgeError, RenderError, Stage};
use crate::exporter::Exporter;
use crate::resolve::{
    absolute, resolve_data, resolve_template, DataSource, Probe, TemplateSource,
    EXTERNAL_TEMPLATE_PATH,
};
use crate::sources::{load_invoice, load_template};
use crate::templating::Renderer;

/// Default destination of the generated PDF.
pub const DEFAULT_OUTPUT: &str = "invoice.pdf";

/// Inputs of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Explicit data file; the built-in sample when `None`.
    pub data: Option<PathBuf>,
    /// Explicit template; the resolution chain decides when `None`.
    pub template: Option<PathBuf>,
    pub output: PathBuf,
    /// Where an editable template is looked for.
    pub external_template: PathBuf,
    /// Also write the rendered markup here.
    pub emit_html: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: None,
            template: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            external_template: PathBuf::from(EXTERNAL_TEMPLATE_PATH),
            emit_html: None,
        }
    }
}

/// Progress of a run. Steps advance strictly forward; any failure ends in
/// `Failed` with the step that broke and the error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Start,
    DataResolved,
    Rendered,
    Exported,
    Done,
    Failed { stage: Stage, cause: String },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed { .. })
    }
}

/// Milestones reported while a run progresses.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    DataLoaded {
        number: &'a str,
        source: &'a DataSource,
    },
    TemplateResolved {
        source: &'a TemplateSource,
    },
    TemplateProcessed,
    MarkupWritten {
        path: &'a Path,
    },
    Exported {
        path: &'a Path,
        bytes: u64,
    },
}

/// Receives progress events.
pub trait Reporter {
    fn report(&mut self, event: &Event<'_>);
}

/// Prints the step trace to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// One trace line per event.
    pub fn line(event: &Event<'_>) -> String {
        match event {
            Event::DataLoaded { number, source } => {
                let origin = match source {
                    DataSource::File(path) => absolute(path).display().to_string(),
                    DataSource::Sample => source.to_string(),
                };
                format!("[1/3] Invoice data loaded    \u{2192} {number}  [{origin}]")
            }
            Event::TemplateResolved { source } => {
                format!("         Template source   \u{2192} {source}")
            }
            Event::TemplateProcessed => "[2/3] Template processed     \u{2192} done".to_string(),
            Event::MarkupWritten { path } => {
                format!("         Markup written    \u{2192} {}", path.display())
            }
            Event::Exported { path, .. } => {
                format!("[3/3] PDF exported           \u{2192} {}", path.display())
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: &Event<'_>) {
        println!("{}", Self::line(event));
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub invoice_number: String,
    pub data: DataSource,
    pub template: TemplateSource,
    /// Absolute path of the written PDF.
    pub output: PathBuf,
    pub bytes_written: u64,
}

/// Counts bytes passed through to the inner writer.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One-shot generator wired to its collaborators.
pub struct Pipeline<'a, R, E> {
    config: PipelineConfig,
    renderer: R,
    exporter: E,
    probe: &'a dyn Probe,
    state: RefCell<RunState>,
}

impl<'a, R: Renderer, E: Exporter> Pipeline<'a, R, E> {
    pub fn new(config: PipelineConfig, renderer: R, exporter: E, probe: &'a dyn Probe) -> Self {
        Self {
            config,
            renderer,
            exporter,
            probe,
            state: RefCell::new(RunState::Start),
        }
    }

    /// Where the last run got to; `Start` before the first run.
    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    /// Run every step once, in order. The first failure aborts the run.
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<RunReport, ForgeError> {
        self.state.replace(RunState::Start);
        match self.execute(reporter) {
            Ok(report) => {
                self.advance(RunState::Done);
                Ok(report)
            }
            Err(err) => {
                self.advance(RunState::Failed {
                    stage: err.stage(),
                    cause: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn advance(&self, next: RunState) {
        let mut state = self.state.borrow_mut();
        log::debug!("pipeline: {:?} -> {next:?}", *state);
        *state = next;
    }

    fn execute(&self, reporter: &mut dyn Reporter) -> Result<RunReport, ForgeError> {
        let data = resolve_data(self.config.data.as_deref(), self.probe)?;
        let invoice = load_invoice(&data)?;
        reporter.report(&Event::DataLoaded {
            number: invoice.number(),
            source: &data,
        });
        self.advance(RunState::DataResolved);

        let template = resolve_template(
            self.config.template.as_deref(),
            &self.config.external_template,
            self.probe,
        )?;
        reporter.report(&Event::TemplateResolved { source: &template });
        let template_text = load_template(&template)?;
        let context = RenderContext::bind(&invoice)
            .map_err(|e| RenderError::Context(e.to_string()))?;
        let markup = self.renderer.render(&template_text, &context)?;
        reporter.report(&Event::TemplateProcessed);
        self.advance(RunState::Rendered);

        if let Some(path) = &self.config.emit_html {
            let path = absolute(path);
            write_markup(&path, &markup)?;
            reporter.report(&Event::MarkupWritten { path: &path });
        }

        let output = absolute(&self.config.output);
        let bytes_written = self.export(&markup, &output)?;
        reporter.report(&Event::Exported {
            path: &output,
            bytes: bytes_written,
        });
        self.advance(RunState::Exported);

        Ok(RunReport {
            invoice_number: invoice.number().to_string(),
            data,
            template,
            output,
            bytes_written,
        })
    }

    /// Open `output`, hand the stream to the exporter, then flush and close
    /// it whether or not the export succeeded.
    fn export(&self, markup: &str, output: &Path) -> Result<u64, ForgeError> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(export_io(parent))?;
        }
        let file = File::create(output).map_err(export_io(output))?;
        let mut sink = CountingWriter {
            inner: BufWriter::new(file),
            count: 0,
        };

        let exported = self.exporter.export(markup, &mut sink);
        let flushed = sink.flush();
        let written = sink.count;
        drop(sink);

        exported.map_err(|source| ForgeError::Export {
            path: output.to_path_buf(),
            source,
        })?;
        flushed.map_err(export_io(output))?;
        log::debug!("wrote {written} bytes to {}", output.display());
        Ok(written)
    }
}

fn export_io(path: &Path) -> impl FnOnce(io::Error) -> ForgeError {
    let path = path.to_path_buf();
    move |source| ForgeError::Io {
        stage: Stage::Export,
        path,
        source,
    }
}

fn write_markup(path: &Path, markup: &str) -> Result<(), ForgeError> {
    let io_err = |source| ForgeError::Io {
        stage: Stage::Template,
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, markup).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CONTEXT_KEY;
    use crate::error::{ConfigIssue, ExportError};
    use std::cell::Cell;

    /// Renders the invoice number and grand total, counting calls.
    #[derive(Default)]
    struct FakeRenderer {
        calls: Cell<usize>,
    }

    impl Renderer for FakeRenderer {
        fn render(&self, template: &str, context: &RenderContext) -> Result<String, RenderError> {
            self.calls.set(self.calls.get() + 1);
            let inv = context
                .get(CONTEXT_KEY)
                .ok_or_else(|| RenderError::Context("missing invoice".into()))?;
            Ok(format!(
                "{template}|{}|{}",
                inv["invoiceNumber"].as_str().unwrap_or_default(),
                inv["grandTotal"].as_str().unwrap_or_default()
            ))
        }
    }

    /// Writes the markup verbatim.
    struct EchoExporter;

    impl Exporter for EchoExporter {
        fn export(&self, markup: &str, sink: &mut dyn Write) -> Result<(), ExportError> {
            sink.write_all(markup.as_bytes())?;
            Ok(())
        }
    }

    /// Writes a few bytes, then fails.
    struct FailingExporter;

    impl Exporter for FailingExporter {
        fn export(&self, _: &str, sink: &mut dyn Write) -> Result<(), ExportError> {
            sink.write_all(b"%PDF-partial")?;
            Err(ExportError::Pdf("boom".into()))
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl Reporter for Recorder {
        fn report(&mut self, event: &Event<'_>) {
            self.0.push(ConsoleReporter::line(event));
        }
    }

    fn nothing_exists(_: &Path) -> bool {
        false
    }

    fn config_in(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            output: dir.join("out").join("invoice.pdf"),
            external_template: dir.join("templates").join("invoice.html"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn defaults_run_sample_through_bundled_template() {
        let dir = tempfile::tempdir().unwrap();
        let probe = nothing_exists;
        let pipeline = Pipeline::new(config_in(dir.path()), FakeRenderer::default(), EchoExporter, &probe);
        assert_eq!(pipeline.state(), RunState::Start);
        let mut rec = Recorder::default();
        let report = pipeline.run(&mut rec).unwrap();
        assert_eq!(pipeline.state(), RunState::Done);

        assert_eq!(report.data, DataSource::Sample);
        assert_eq!(report.template, TemplateSource::Bundled);
        assert_eq!(report.invoice_number, "INV-2026-0042");
        let written = fs::read_to_string(&report.output).unwrap();
        assert!(written.ends_with("|INV-2026-0042|41888.82"));
        assert_eq!(report.bytes_written, written.len() as u64);

        assert_eq!(rec.0.len(), 4);
        assert!(rec.0[0].starts_with("[1/3] Invoice data loaded"));
        assert!(rec.0[0].ends_with("INV-2026-0042  [demo data]"));
        assert!(rec.0[1].ends_with("[bundled]"));
        assert!(rec.0[2].starts_with("[2/3]"));
        assert!(rec.0[3].starts_with("[3/3]"));
    }

    #[test]
    fn missing_data_fails_before_the_template_step() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FakeRenderer::default();
        let config = PipelineConfig {
            data: Some(dir.path().join("absent.json")),
            ..config_in(dir.path())
        };
        let probe = nothing_exists;
        let pipeline = Pipeline::new(config, renderer, EchoExporter, &probe);
        let mut rec = Recorder::default();
        let err = pipeline.run(&mut rec).unwrap_err();

        assert!(matches!(
            err,
            ForgeError::Configuration {
                stage: Stage::Data,
                issue: ConfigIssue::DataNotFound,
                ..
            }
        ));
        assert!(rec.0.is_empty());
        assert_eq!(pipeline.renderer.calls.get(), 0);
        match pipeline.state() {
            RunState::Failed { stage, cause } => {
                assert_eq!(stage, Stage::Data);
                assert!(cause.contains("absent.json"));
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn missing_explicit_template_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            template: Some(dir.path().join("nope.html")),
            ..config_in(dir.path())
        };
        let probe = |_: &Path| false;
        let err = Pipeline::new(config, FakeRenderer::default(), EchoExporter, &probe)
            .run(&mut Recorder::default())
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Template);
        assert!(err.is_configuration());
    }

    #[test]
    fn failing_export_still_flushes_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let output = config.output.clone();
        let probe = nothing_exists;
        let mut rec = Recorder::default();
        let pipeline = Pipeline::new(config, FakeRenderer::default(), FailingExporter, &probe);
        let err = pipeline.run(&mut rec).unwrap_err();

        assert_eq!(
            pipeline.state(),
            RunState::Failed {
                stage: Stage::Export,
                cause: err.to_string(),
            }
        );
        assert!(pipeline.state().is_terminal());
        assert_eq!(err.stage(), Stage::Export);
        assert!(matches!(err, ForgeError::Export { .. }));
        assert_eq!(fs::read(&output).unwrap(), b"%PDF-partial");
        assert_eq!(rec.0.len(), 3);
    }

    #[test]
    fn emits_markup_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("debug").join("invoice.html");
        let config = PipelineConfig {
            emit_html: Some(html.clone()),
            ..config_in(dir.path())
        };
        let probe = nothing_exists;
        let mut rec = Recorder::default();
        Pipeline::new(config, FakeRenderer::default(), EchoExporter, &probe)
            .run(&mut rec)
            .unwrap();
        assert!(fs::read_to_string(&html).unwrap().contains("INV-2026-0042"));
        assert!(rec.0.iter().any(|l| l.contains("Markup written")));
    }

    #[test]
    fn render_failure_is_a_template_stage_error() {
        struct Broken;
        impl Renderer for Broken {
            fn render(&self, _: &str, _: &RenderContext) -> Result<String, RenderError> {
                Err(RenderError::Engine("unexpected token".into()))
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let probe = nothing_exists;
        let err = Pipeline::new(config_in(dir.path()), Broken, EchoExporter, &probe)
            .run(&mut Recorder::default())
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Template);
        assert!(err.to_string().starts_with("[2/3] process template"));
    }
}
