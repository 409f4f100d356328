//! Defines [`ProcessedFile`] and the types it carries. A processed file is
//! derived once per run from a [`crate::reader::RawFile`] and the site
//! configuration, then consumed by the renderer and writer.

use crate::tag::Tag;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// A content file after processing, ready to render or copy.
#[derive(Debug, Clone)]
pub enum ProcessedFile {
    /// A standalone page.
    Page(Document),

    /// A dated blog post.
    Post(Document),

    /// A pass-through file copied to the output verbatim.
    Static(StaticFile),
}

impl ProcessedFile {
    /// The path of the source file relative to the content directory. For
    /// generated listing pages this is the output path.
    pub fn source(&self) -> &Path {
        match self {
            ProcessedFile::Page(doc) | ProcessedFile::Post(doc) => &doc.source,
            ProcessedFile::Static(file) => &file.source,
        }
    }

    /// The destination relative to the output directory.
    pub fn output_path(&self) -> &Path {
        match self {
            ProcessedFile::Page(doc) | ProcessedFile::Post(doc) => &doc.output_path,
            ProcessedFile::Static(file) => &file.dest,
        }
    }

    /// Returns the document for pages and posts.
    pub fn document(&self) -> Option<&Document> {
        match self {
            ProcessedFile::Page(doc) | ProcessedFile::Post(doc) => Some(doc),
            ProcessedFile::Static(_) => None,
        }
    }
}

/// A page or post: parsed front matter, body, and where it goes.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// The source path relative to the content directory.
    pub source: PathBuf,

    /// The name of the layout which renders this document.
    pub layout: String,

    pub title: String,

    /// The publication date. Always set for posts.
    pub date: Option<NaiveDate>,

    /// Whether the post is a draft (explicitly, or dated in the future).
    pub draft: bool,

    pub tags: Vec<Tag>,

    /// Front matter fields other than the recognized ones.
    pub meta: serde_json::Map<String, serde_json::Value>,

    /// The body as written, after the front matter.
    pub body: String,

    /// The body as HTML.
    pub html: String,

    /// The HTML summary of the body (see [`crate::markdown::summary`]).
    pub summary: String,

    /// The destination relative to the output directory, e.g.
    /// `about/index.html`.
    pub output_path: PathBuf,

    /// The site-absolute URL, e.g. `/about/`.
    pub url: String,

    /// Set on generated post listings.
    pub listing: Option<Listing>,
}

/// The posts shown on a generated listing page.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// The tag the listing is restricted to, if any.
    pub tag: Option<Tag>,

    /// The listed posts, most recent first.
    pub posts: Vec<PostSummary>,
}

/// A short form of a post, used on listing pages.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub title: String,
    pub url: String,
    pub date: NaiveDate,
    pub summary: String,

    /// True if `summary` is shorter than the full body.
    pub summarized: bool,
    pub tags: Vec<Tag>,
}

impl PostSummary {
    /// Summarizes a post document.
    pub fn of(doc: &Document) -> PostSummary {
        let (summary, summarized) = crate::markdown::summary(&doc.html);
        PostSummary {
            title: doc.title.clone(),
            url: doc.url.clone(),
            date: doc.date.unwrap_or_default(),
            summary: summary.to_owned(),
            summarized,
            tags: doc.tags.clone(),
        }
    }
}

/// A pass-through file.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticFile {
    /// The path relative to the content directory.
    pub source: PathBuf,

    /// The path relative to the site root the bytes are copied from.
    pub origin: PathBuf,

    /// The destination relative to the output directory.
    pub dest: PathBuf,
}

/// A rendered page, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// The destination relative to the output directory.
    pub output_path: PathBuf,

    /// The final HTML document.
    pub html: String,
}
