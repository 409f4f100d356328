//! Converts markdown bodies to HTML and extracts post summaries.

use pulldown_cmark::{html, Options, Parser};

/// Marks the end of a post's summary in its body.
pub const FOLD_TAG: &str = "<!-- more -->";

/// Extensions whose bodies are treated as markdown. Other content bodies are
/// passed through as HTML.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Converts markdown to HTML.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

/// Returns the summary of a rendered body: everything before [`FOLD_TAG`],
/// or the first paragraph if there's no fold. The flag reports whether the
/// summary is shorter than the body.
pub fn summary(html: &str) -> (&str, bool) {
    if let Some(i) = html.find(FOLD_TAG) {
        return (html[..i].trim_end(), true);
    }
    match html.find("</p>") {
        Some(i) => {
            let end = i + "</p>".len();
            (&html[..end], end < html.trim_end().len())
        }
        None => (html, false),
    }
}
