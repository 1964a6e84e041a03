//! # invoice-forge – invoice data → PDF in one shot
//!
//! A run resolves its inputs, renders a template and exports the markup:
//!
//! 1. **Resolve** – pick the data source and template source ([`resolve`])
//!    and load them ([`sources`])
//! 2. **Model** – the invoice and its derived totals ([`invoice`])
//! 3. **Render** – bind the invoice under `invoice` ([`context`]) and run it
//!    through a [`Renderer`] ([`templating`])
//! 4. **Export** – turn markup into PDF bytes with an [`Exporter`]
//!    ([`exporter`]); the built-in engine parses ([`dom`]), styles
//!    ([`style`]), lays out ([`layout`]), paginates ([`pagination`]) and
//!    paints ([`render`])
//!
//! [`pipeline`] ties the steps together and reports progress.

pub mod context;
pub mod dom;
pub mod error;
pub mod exporter;
pub mod fonts;
pub mod invoice;
pub mod layout;
pub mod layout_config;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod sources;
pub mod style;
pub mod templating;

pub use error::{ForgeError, Stage};
pub use exporter::{Exporter, Orientation, PageSetup, PdfExporter};
pub use invoice::{Invoice, LineItem, Party};
pub use pipeline::{ConsoleReporter, Pipeline, PipelineConfig, Reporter, RunReport, RunState};
pub use resolve::FsProbe;
pub use templating::{Renderer, TeraRenderer};
