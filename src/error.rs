//! Error taxonomy for a generator run.

use std::fmt;
use std::path::PathBuf;

/// The pipeline step an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Data,
    Template,
    Export,
}

impl Stage {
    /// Position of the step in the three-step trace.
    pub fn ordinal(self) -> usize {
        match self {
            Stage::Data => 1,
            Stage::Template => 2,
            Stage::Export => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Data => "load data",
            Stage::Template => "process template",
            Stage::Export => "export pdf",
        };
        write!(f, "[{}/3] {name}", self.ordinal())
    }
}

/// What was wrong with an explicitly supplied input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    DataNotFound,
    MalformedData(String),
    TemplateNotFound,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::DataNotFound => f.write_str("data file not found"),
            ConfigIssue::MalformedData(detail) => write!(f, "malformed data ({detail})"),
            ConfigIssue::TemplateNotFound => f.write_str("template not found"),
        }
    }
}

/// Failure raised by a [`Renderer`](crate::templating::Renderer).
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template engine: {0}")]
    Engine(String),
    #[error("render context: {0}")]
    Context(String),
}

/// Failure raised by an [`Exporter`](crate::exporter::Exporter).
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("layout failed: {0}")]
    Layout(String),
    #[error("pdf encoding failed: {0}")]
    Pdf(String),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure that aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("{stage}: {issue}: {}", .path.display())]
    Configuration {
        stage: Stage,
        path: PathBuf,
        issue: ConfigIssue,
    },

    #[error("{stage}: {0}", stage = Stage::Template)]
    Render(#[from] RenderError),

    #[error("{}: {}: {source}", Stage::Export, .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: ExportError,
    },

    #[error("{stage}: {}: {source}", .path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ForgeError {
    /// The step that failed.
    pub fn stage(&self) -> Stage {
        match self {
            ForgeError::Configuration { stage, .. } | ForgeError::Io { stage, .. } => *stage,
            ForgeError::Render(_) => Stage::Template,
            ForgeError::Export { .. } => Stage::Export,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ForgeError::Configuration { .. })
    }
}
