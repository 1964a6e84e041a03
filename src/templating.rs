//! Renderer capability: template source + context → markup text.

use std::error::Error as _;

use tera::Tera;

use crate::context::RenderContext;
use crate::error::RenderError;

/// Turns a template source and a data context into markup.
pub trait Renderer {
    fn render(&self, template: &str, context: &RenderContext) -> Result<String, RenderError>;
}

/// [`Renderer`] backed by Tera (Jinja2-style syntax).
#[derive(Debug, Clone)]
pub struct TeraRenderer {
    /// Escape HTML in substituted values (default: on).
    pub autoescape: bool,
}

impl Default for TeraRenderer {
    fn default() -> Self {
        Self { autoescape: true }
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template: &str, context: &RenderContext) -> Result<String, RenderError> {
        let ctx = tera::Context::from_value(context.to_value())
            .map_err(|e| RenderError::Context(describe(&e)))?;
        Tera::one_off(template, &ctx, self.autoescape).map_err(|e| RenderError::Engine(describe(&e)))
    }
}

/// Flatten a Tera error and its causes into one line; the top-level message
/// alone rarely says what went wrong.
fn describe(err: &tera::Error) -> String {
    let mut msg = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        cause = inner.source();
    }
    msg
}
