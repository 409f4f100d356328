//! Renders pages and posts through a [`LayoutEngine`]. The engine is keyed
//! by layout name and takes the site configuration plus the document;
//! [`TemplateEngine`] is the implementation backed by the compiled
//! `_layouts`.
//!
//! Every render runs in its own context: a fresh template is parsed for the
//! file and dropped afterwards, and panics are caught so one file's failure
//! can't take its siblings down with it.

use crate::compiler::{self, Layouts};
use crate::file::{Document, RenderedPage};
use crate::processor::SiteInfo;
use gtmpl::{Context, Value};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

/// The doctype prepended to every rendered page which lacks one.
pub const DOCTYPE: &str = "<!doctype html>";

/// Layouts can't emit live `<script>` tags while they're being evaluated, so
/// they write this placeholder instead. It's replaced with `script` in the
/// final output.
pub const SCRIPT_PLACEHOLDER: &str = "citatsmle-script";

/// The input to a layout: the site configuration and the document.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub site: &'a SiteInfo,
    pub content: &'a Document,
}

impl RenderInput<'_> {
    /// Converts the input into a template [`Value`] with `siteConfig` and
    /// `content` fields.
    pub fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("siteConfig".to_owned(), Value::from(self.site));
        m.insert("content".to_owned(), Value::from(self.content));
        Value::Object(m)
    }
}

/// Turns a document into HTML using a named layout.
pub trait LayoutEngine: Send + Sync {
    /// Returns true if the engine knows the layout called `name`.
    fn has_layout(&self, name: &str) -> bool;

    /// Renders `input` with the layout called `layout`, returning the HTML
    /// body or a description of what went wrong.
    fn render(&self, layout: &str, input: &RenderInput) -> Result<String, String>;
}

/// A [`LayoutEngine`] over compiled `gtmpl` layouts. When the layouts
/// include the Base wrapper, each layout's output is rendered into it as
/// `.body`.
pub struct TemplateEngine {
    layouts: Layouts,
}

impl TemplateEngine {
    pub fn new(layouts: Layouts) -> TemplateEngine {
        TemplateEngine { layouts }
    }
}

impl LayoutEngine for TemplateEngine {
    fn has_layout(&self, name: &str) -> bool {
        self.layouts.get(name).is_some()
    }

    fn render(&self, layout: &str, input: &RenderInput) -> Result<String, String> {
        let source = self
            .layouts
            .get(layout)
            .ok_or_else(|| format!("unknown layout `{}`", layout))?;

        let mut value = input.to_value();
        let body = execute(source, &value)?;

        match self.layouts.base() {
            None => Ok(body),
            Some(base) => {
                if let Value::Object(m) = &mut value {
                    m.insert("body".to_owned(), Value::String(body));
                }
                execute(base, &value).map_err(|e| format!("in Base layout: {}", e))
            }
        }
    }
}

// Parses a fresh template from `source` and executes it against `value`.
fn execute(source: &str, value: &Value) -> Result<String, String> {
    let template = compiler::parse(source)?;
    let context = Context::from(value.clone())?;
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &context)?;
    String::from_utf8(out).map_err(|e| e.to_string())
}

/// Renders a page or post. The result's output path is the document's own;
/// its HTML has placeholders restored and a doctype prepended.
pub fn render_document(
    engine: &dyn LayoutEngine,
    site: &SiteInfo,
    doc: &Document,
) -> Result<RenderedPage, RenderFailure> {
    let fail = |message: String| RenderFailure {
        source: doc.source.clone(),
        layout: doc.layout.clone(),
        message,
    };

    if !engine.has_layout(&doc.layout) {
        return Err(fail(format!("unknown layout `{}`", doc.layout)));
    }

    let input = RenderInput { site, content: doc };
    let body = match panic::catch_unwind(AssertUnwindSafe(|| engine.render(&doc.layout, &input))) {
        Ok(Ok(body)) => body,
        Ok(Err(message)) => return Err(fail(message)),
        Err(payload) => return Err(fail(panic_message(payload))),
    };

    Ok(RenderedPage {
        output_path: doc.output_path.clone(),
        html: finish(&body),
    })
}

// Restores script tags and makes sure the page starts with a doctype.
fn finish(body: &str) -> String {
    let html = body.replace(SCRIPT_PLACEHOLDER, "script");
    if html.trim_start().to_ascii_lowercase().starts_with("<!doctype") {
        html
    } else {
        let mut out = String::with_capacity(DOCTYPE.len() + html.len());
        out.push_str(DOCTYPE);
        out.push_str(&html);
        out
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(s) => format!("layout panicked: {}", s),
        Err(payload) => match payload.downcast::<&str>() {
            Ok(s) => format!("layout panicked: {}", s),
            Err(_) => "layout panicked".to_owned(),
        },
    }
}

/// A failed render, attributed to the document's source and layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFailure {
    pub source: PathBuf,
    pub layout: String,
    pub message: String,
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Unable to process {} at {}: {}",
            self.layout,
            self.source.display(),
            self.message
        )
    }
}

impl std::error::Error for RenderFailure {}
