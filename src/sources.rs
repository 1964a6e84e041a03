//! Loading the resolved sources into memory.

use std::fs;
use std::path::Path;

use crate::error::{ConfigIssue, ForgeError, Stage};
use crate::invoice::Invoice;
use crate::resolve::{absolute, DataSource, TemplateSource};

/// Template compiled into the binary; the last link of the template chain.
pub const BUNDLED_TEMPLATE: &str = include_str!("../assets/templates/invoice.html");

/// Build the invoice for `source`.
pub fn load_invoice(source: &DataSource) -> Result<Invoice, ForgeError> {
    match source {
        DataSource::Sample => Ok(Invoice::sample()),
        DataSource::File(path) => {
            let json = read(path, Stage::Data)?;
            Invoice::from_json(&json).map_err(|e| ForgeError::Configuration {
                stage: Stage::Data,
                path: absolute(path),
                issue: ConfigIssue::MalformedData(e.to_string()),
            })
        }
    }
}

/// Read the template text for `source`.
pub fn load_template(source: &TemplateSource) -> Result<String, ForgeError> {
    match source {
        TemplateSource::Explicit(path) | TemplateSource::External(path) => {
            read(path, Stage::Template)
        }
        TemplateSource::Bundled => Ok(BUNDLED_TEMPLATE.to_string()),
    }
}

fn read(path: &Path, stage: Stage) -> Result<String, ForgeError> {
    fs::read_to_string(path).map_err(|source| ForgeError::Io {
        stage,
        path: absolute(path),
        source,
    })
}
