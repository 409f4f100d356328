//! Turns the raw files read from the content directory into
//! [`ProcessedFile`]s: parses front matter, picks a layout, computes output
//! paths, and classifies each file as a page, post, or static file. Also
//! generates the post listing and tag pages.
//!
//! Processing is all-or-nothing. Problems with individual files are
//! collected and reported together as a single [`ProcessError`] so the user
//! sees every malformed file at once.

use crate::config::SiteConfig;
use crate::file::{Document, Listing, PostSummary, ProcessedFile, StaticFile};
use crate::markdown;
use crate::reader::{RawFile, Source};
use crate::tag::{Tag, TAGS_DIR};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// The default layout for pages.
pub const PAGE_LAYOUT: &str = "Page";

/// The default layout for posts.
pub const POST_LAYOUT: &str = "Post";

/// The layout of the generated listing of all posts.
pub const POSTS_LAYOUT: &str = "Posts";

/// The layout of the generated per-tag listings.
pub const TAG_LAYOUT: &str = "Tag";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether future-dated and explicit drafts are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Drafts are left out.
    Normal,

    /// Drafts are rendered along with everything else.
    Draft,
}

/// The outcome of a successful processing pass.
#[derive(Debug, Clone)]
pub struct Site {
    /// Configuration derived for layouts.
    pub info: SiteInfo,

    /// Every file to render or copy. Pages and static files come first in
    /// path order, then posts (most recent first), then generated listings.
    pub files: Vec<ProcessedFile>,
}

impl Site {
    /// The posts, most recent first.
    pub fn posts(&self) -> impl Iterator<Item = &Document> {
        self.files.iter().filter_map(|file| match file {
            ProcessedFile::Post(doc) => Some(doc),
            _ => None,
        })
    }
}

/// The site-wide values handed to every layout.
#[derive(Debug, Clone, Default)]
pub struct SiteInfo {
    pub title: String,

    /// Every tag used by a published post, sorted by name.
    pub tags: Vec<Tag>,

    /// The site-absolute URL of the feed, if one is generated.
    pub feed_url: Option<String>,

    /// Configuration keys quire doesn't recognize.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct FrontMatter {
    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    layout: Option<String>,

    #[serde(default)]
    published: Option<String>,

    #[serde(default)]
    tags: Option<Tags>,

    #[serde(default)]
    draft: bool,

    #[serde(default)]
    slug: Option<String>,

    #[serde(flatten)]
    meta: serde_json::Map<String, serde_json::Value>,
}

// Tags may be written as a list or as a space-separated string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Tags {
    List(Vec<String>),
    Words(String),
}

impl Tags {
    fn names(&self) -> Vec<&str> {
        match self {
            Tags::List(list) => list.iter().map(|s| s.as_str()).collect(),
            Tags::Words(words) => words.split_whitespace().collect(),
        }
    }
}

/// Processes the raw `files` of a site. `today` decides which posts are
/// future-dated drafts; in [`Mode::Normal`] those are dropped.
pub fn process(
    config: &SiteConfig,
    files: &[RawFile],
    mode: Mode,
    today: NaiveDate,
) -> Result<Site, ProcessError> {
    let processor = Processor {
        config,
        mode,
        today,
    };

    let mut problems = Vec::new();
    let mut others = Vec::new();
    let mut posts = Vec::new();
    for file in files {
        match processor.process_file(file) {
            Ok(Some(ProcessedFile::Post(doc))) => posts.push(doc),
            Ok(Some(processed)) => others.push(processed),
            Ok(None) => log::debug!("skipping draft `{}`", file.path.display()),
            Err(message) => problems.push(Problem {
                path: file.path.clone(),
                message,
            }),
        }
    }

    problems.extend(tag_page_clashes(&posts));
    if !problems.is_empty() {
        return Err(ProcessError { problems });
    }

    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.source.cmp(&b.source)));

    let taken: HashSet<&Path> = others
        .iter()
        .map(|f| f.output_path())
        .chain(posts.iter().map(|p| p.output_path.as_path()))
        .collect();
    let listings: Vec<ProcessedFile> = processor
        .listings(&posts)
        .into_iter()
        .filter(|doc| !taken.contains(doc.output_path.as_path()))
        .map(ProcessedFile::Page)
        .collect();

    let info = SiteInfo {
        title: config.site_title.clone(),
        tags: used_tags(&posts),
        feed_url: config
            .feed
            .as_ref()
            .map(|feed| format!("/{}", slashed(&feed.path))),
        extra: config.extra.clone(),
    };

    let mut out = others;
    out.extend(posts.into_iter().map(ProcessedFile::Post));
    out.extend(listings);
    Ok(Site { info, files: out })
}

struct Processor<'a> {
    config: &'a SiteConfig,
    mode: Mode,
    today: NaiveDate,
}

impl Processor<'_> {
    // Returns `Ok(None)` for drafts which aren't published in this mode.
    fn process_file(&self, file: &RawFile) -> Result<Option<ProcessedFile>, String> {
        let text = match &file.source {
            Source::Asset => {
                return Ok(Some(ProcessedFile::Static(StaticFile {
                    source: file.path.clone(),
                    origin: file.origin.clone(),
                    dest: file.path.clone(),
                })))
            }
            Source::Text(text) => text,
        };

        let (yaml, body) = split_front_matter(text)?;
        let front_matter: FrontMatter = match yaml {
            Some(yaml) if !yaml.trim().is_empty() => {
                serde_yaml::from_str(yaml).map_err(|e| format!("invalid front matter: {}", e))?
            }
            _ => FrontMatter::default(),
        };

        let is_markdown = markdown::MARKDOWN_EXTENSIONS.contains(&file.extension().as_str());
        let html = if is_markdown {
            markdown::to_html(body)
        } else {
            body.to_owned()
        };
        let stem = file_stem(&file.path)?;

        let mut doc = Document {
            source: file.path.clone(),
            title: String::new(),
            date: None,
            draft: front_matter.draft,
            tags: self.tags(&front_matter)?,
            meta: front_matter.meta,
            body: body.to_owned(),
            summary: markdown::summary(&html).0.to_owned(),
            html,
            ..Document::default()
        };

        if self.is_post(&file.path, &stem) {
            let (date, rest) = match parse_date_prefix(&stem) {
                Some((date, rest)) => (Some(date), rest),
                None => (None, stem.as_str()),
            };
            let date = match &front_matter.published {
                Some(published) => Some(
                    NaiveDate::parse_from_str(published.trim(), DATE_FORMAT).map_err(|_| {
                        format!("`published` must be a YYYY-MM-DD date, found `{}`", published)
                    })?,
                ),
                None => date,
            }
            .ok_or_else(|| {
                "post has no date; set `published` or prefix the file name with YYYY-MM-DD-"
                    .to_owned()
            })?;

            doc.date = Some(date);
            doc.draft = doc.draft || date > self.today;
            if doc.draft && self.mode == Mode::Normal {
                return Ok(None);
            }

            let slug = match &front_matter.slug {
                Some(slug) => slug.clone(),
                None => slug::slugify(rest),
            };
            let parent = file.path.parent().unwrap_or_else(|| Path::new(""));
            doc.output_path = parent.join(&slug).join("index.html");
            doc.layout = front_matter.layout.unwrap_or_else(|| POST_LAYOUT.to_owned());
            doc.title = front_matter.title.unwrap_or_else(|| humanize(rest));
            doc.url = url_of(&doc.output_path);
            return Ok(Some(ProcessedFile::Post(doc)));
        }

        let parent = file.path.parent().unwrap_or_else(|| Path::new(""));
        doc.output_path = match &front_matter.slug {
            Some(slug) => parent.join(slug).join("index.html"),
            None if stem == "index" => parent.join("index.html"),
            None => parent.join(&stem).join("index.html"),
        };
        doc.layout = front_matter.layout.unwrap_or_else(|| PAGE_LAYOUT.to_owned());
        doc.title = front_matter.title.unwrap_or_else(|| humanize(&stem));
        doc.url = url_of(&doc.output_path);
        Ok(Some(ProcessedFile::Page(doc)))
    }

    // Posts are the content files under the posts directory, except the
    // directory's own index page.
    fn is_post(&self, path: &Path, stem: &str) -> bool {
        path.starts_with(&self.config.posts_dir)
            && !(stem == "index" && path.parent() == Some(self.config.posts_dir.as_path()))
    }

    fn tags(&self, front_matter: &FrontMatter) -> Result<Vec<Tag>, String> {
        let names = match &front_matter.tags {
            Some(tags) => tags.names(),
            None => return Ok(Vec::new()),
        };

        let mut seen = HashSet::new();
        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            let tag = Tag::new(name);
            if let Some(allowed) = &self.config.tags {
                if !allowed.contains(&tag.name) {
                    return Err(format!(
                        "unknown tag `{}` (allowed tags: {})",
                        tag.name,
                        allowed.join(", ")
                    ));
                }
            }
            if seen.insert(tag.name.clone()) {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    // Builds the listing of all posts and one listing per tag. `posts` must
    // already be in listing order.
    fn listings(&self, posts: &[Document]) -> Vec<Document> {
        if posts.is_empty() {
            return Vec::new();
        }

        let summaries: Vec<PostSummary> = posts.iter().map(PostSummary::of).collect();

        let mut by_tag: BTreeMap<String, (Tag, Vec<PostSummary>)> = BTreeMap::new();
        for (post, summary) in posts.iter().zip(&summaries) {
            for tag in &post.tags {
                by_tag
                    .entry(tag.name.clone())
                    .or_insert_with(|| (tag.clone(), Vec::new()))
                    .1
                    .push(summary.clone());
            }
        }

        let mut listings = Vec::with_capacity(by_tag.len() + 1);
        listings.push(listing(
            self.config.posts_dir.join("index.html"),
            POSTS_LAYOUT,
            "Posts".to_owned(),
            Listing {
                tag: None,
                posts: summaries,
            },
        ));
        for (_, (tag, posts)) in by_tag {
            listings.push(listing(
                Path::new(TAGS_DIR).join(tag.slug()).join("index.html"),
                TAG_LAYOUT,
                tag.name.clone(),
                Listing {
                    tag: Some(tag),
                    posts,
                },
            ));
        }
        listings
    }
}

fn listing(output_path: PathBuf, layout: &str, title: String, listing: Listing) -> Document {
    Document {
        source: output_path.clone(),
        layout: layout.to_owned(),
        title,
        url: url_of(&output_path),
        output_path,
        listing: Some(listing),
        ..Document::default()
    }
}

// Distinct tags whose names slugify alike (`c++` and `c#`) would share a
// tag page. Each post using the later of two such names is a problem.
fn tag_page_clashes(posts: &[Document]) -> Vec<Problem> {
    let mut owners: BTreeMap<String, &str> = BTreeMap::new();
    let mut problems = Vec::new();
    for post in posts {
        for tag in &post.tags {
            let owner = *owners.entry(tag.slug()).or_insert(tag.name.as_str());
            if owner != tag.name {
                problems.push(Problem {
                    path: post.source.clone(),
                    message: format!(
                        "tag `{}` would share the page `{}` with tag `{}`",
                        tag.name, tag.url, owner
                    ),
                });
            }
        }
    }
    problems
}

fn used_tags(posts: &[Document]) -> Vec<Tag> {
    let mut tags: Vec<Tag> = posts
        .iter()
        .flat_map(|p| p.tags.iter().cloned())
        .collect::<HashSet<Tag>>()
        .into_iter()
        .collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    tags
}

/// Splits a leading front matter block fenced by `---` lines from the body.
/// Returns `None` for the front matter if the input doesn't start with a
/// fence.
fn split_front_matter(input: &str) -> Result<(Option<&str>, &str), String> {
    const FENCE: &str = "---";
    let input = input.trim_start_matches('\u{feff}');
    let rest = match input.strip_prefix(FENCE) {
        Some(rest) if rest.starts_with('\n') || rest.starts_with("\r\n") => rest,
        _ => return Ok((None, input)),
    };

    let mut offset = 0;
    while let Some(i) = rest[offset..].find("\n---") {
        let fence_start = offset + i + 1;
        let tail = &rest[fence_start + FENCE.len()..];
        if tail.is_empty() || tail.starts_with('\n') || tail.starts_with("\r\n") {
            let body = tail
                .strip_prefix("\r\n")
                .or_else(|| tail.strip_prefix('\n'))
                .unwrap_or(tail);
            return Ok((Some(&rest[..fence_start]), body));
        }
        offset = fence_start + FENCE.len();
    }
    Err("front matter is missing its closing `---`".to_owned())
}

// Parses a `YYYY-MM-DD-` prefix, returning the date and the rest of the
// name.
fn parse_date_prefix(stem: &str) -> Option<(NaiveDate, &str)> {
    let prefix = stem.get(..10)?;
    let date = NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok()?;
    match &stem[10..] {
        "" => Some((date, "")),
        rest => rest.strip_prefix('-').map(|rest| (date, rest)),
    }
}

fn file_stem(path: &Path) -> Result<String, String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_owned())
        .ok_or_else(|| format!("invalid file name: {:?}", path))
}

// `about-us` -> `About us`
fn humanize(stem: &str) -> String {
    let words = stem.replace(['-', '_'], " ");
    let mut chars = words.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// Joins the components of `path` with forward slashes.
fn slashed(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// The site-absolute URL of an `index.html` output path: `about/index.html`
/// becomes `/about/`.
pub fn url_of(output_path: &Path) -> String {
    match output_path.parent().map(slashed) {
        Some(dir) if !dir.is_empty() => format!("/{}/", dir),
        _ => "/".to_owned(),
    }
}

/// A problem with one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// The file's path relative to the content directory.
    pub path: PathBuf,
    pub message: String,
}

/// Represents every problem found while processing a batch of files.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessError {
    pub problems: Vec<Problem>,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "I had a problem processing your source files:")?;
        for problem in &self.problems {
            write!(f, "\n  {}: {}", problem.path.display(), problem.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProcessError {}

#[cfg(test)]
mod test {
    use super::*;

    fn config(json: &str) -> SiteConfig {
        SiteConfig::from_json(json).unwrap()
    }

    fn text(path: &str, content: &str) -> RawFile {
        RawFile {
            path: PathBuf::from(path),
            origin: Path::new("content").join(path),
            source: Source::Text(content.to_owned()),
        }
    }

    fn asset(path: &str) -> RawFile {
        RawFile {
            path: PathBuf::from(path),
            origin: Path::new("content").join(path),
            source: Source::Asset,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
    }

    fn documents(site: &Site) -> Vec<(&str, &Document)> {
        site.files
            .iter()
            .filter_map(|f| match f {
                ProcessedFile::Page(doc) => Some(("page", doc)),
                ProcessedFile::Post(doc) => Some(("post", doc)),
                ProcessedFile::Static(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_split_front_matter() -> Result<(), String> {
        assert_eq!(
            (Some("\ntitle: Hi\n"), "body\n"),
            split_front_matter("---\ntitle: Hi\n---\nbody\n")?
        );
        assert_eq!((None, "# Just a body"), split_front_matter("# Just a body")?);
        assert_eq!(
            (Some("\na: b\n"), ""),
            split_front_matter("---\na: b\n---")?
        );
        // a dashed line inside a value isn't a fence
        assert_eq!(
            (Some("\na: ---x\n"), "body"),
            split_front_matter("---\na: ---x\n---\nbody")?
        );
        assert!(split_front_matter("---\ntitle: Hi\nbody").is_err());
        Ok(())
    }

    #[test]
    fn test_classification() -> Result<(), ProcessError> {
        let files = vec![
            text("about.md", "---\ntitle: About me\n---\n# About"),
            asset("logo.png"),
            text("index.html", "<p>Home</p>"),
            text("posts/2021-01-02-hello-world.md", "---\ntags: [Rust]\n---\nHi"),
        ];
        let site = process(&config(r#"{"siteTitle": "T"}"#), &files, Mode::Normal, today())?;

        let about = match &site.files[0] {
            ProcessedFile::Page(doc) => doc,
            other => panic!("expected a page, got {:?}", other),
        };
        assert_eq!("About me", about.title);
        assert_eq!(PAGE_LAYOUT, about.layout);
        assert_eq!(Path::new("about/index.html"), about.output_path);
        assert_eq!("/about/", about.url);
        assert_eq!("<h1>About</h1>\n", about.html);

        match &site.files[1] {
            ProcessedFile::Static(file) => assert_eq!(
                &StaticFile {
                    source: PathBuf::from("logo.png"),
                    origin: PathBuf::from("content/logo.png"),
                    dest: PathBuf::from("logo.png"),
                },
                file
            ),
            other => panic!("expected a static file, got {:?}", other),
        }

        let home = site.files[2].document().unwrap();
        assert_eq!(Path::new("index.html"), home.output_path);
        assert_eq!("/", home.url);
        assert_eq!("<p>Home</p>", home.html);
        assert_eq!("Index", home.title);

        let post = match &site.files[3] {
            ProcessedFile::Post(doc) => doc,
            other => panic!("expected a post, got {:?}", other),
        };
        assert_eq!(POST_LAYOUT, post.layout);
        assert_eq!("Hello world", post.title);
        assert_eq!(NaiveDate::from_ymd_opt(2021, 1, 2), post.date);
        assert_eq!(Path::new("posts/hello-world/index.html"), post.output_path);
        assert_eq!(vec![Tag::new("rust")], post.tags);
        Ok(())
    }

    #[test]
    fn test_listings() -> Result<(), ProcessError> {
        let files = vec![
            text("posts/2021-01-01-a.md", "---\ntags: elm rust\n---\nA"),
            text("posts/2021-03-01-b.md", "---\ntags: [rust]\n---\nB"),
            text("posts/c.md", "---\npublished: 2021-02-01\n---\nC"),
        ];
        let site = process(&config(r#"{"siteTitle": "T"}"#), &files, Mode::Normal, today())?;

        let order: Vec<&str> = site.posts().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["B", "C", "A"], order);

        let docs = documents(&site);
        let listings: Vec<(&str, &str, usize)> = docs
            .iter()
            .filter_map(|(_, doc)| {
                doc.listing
                    .as_ref()
                    .map(|l| (doc.layout.as_str(), doc.url.as_str(), l.posts.len()))
            })
            .collect();
        assert_eq!(
            vec![
                (POSTS_LAYOUT, "/posts/", 3),
                (TAG_LAYOUT, "/tags/elm/", 1),
                (TAG_LAYOUT, "/tags/rust/", 2),
            ],
            listings
        );
        assert_eq!(
            vec!["elm", "rust"],
            site.info.tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn test_user_index_suppresses_listing() -> Result<(), ProcessError> {
        let files = vec![
            text("posts/index.md", "---\nlayout: Archive\n---\n"),
            text("posts/2021-01-01-a.md", "A"),
        ];
        let site = process(&config(r#"{"siteTitle": "T"}"#), &files, Mode::Normal, today())?;
        let at_index: Vec<&Document> = documents(&site)
            .into_iter()
            .map(|(_, d)| d)
            .filter(|d| d.output_path == Path::new("posts/index.html"))
            .collect();
        assert_eq!(1, at_index.len());
        assert_eq!("Archive", at_index[0].layout);
        Ok(())
    }

    #[test]
    fn test_drafts() -> Result<(), ProcessError> {
        let files = vec![
            text("posts/2021-01-01-old.md", "old"),
            text("posts/2099-01-01-future.md", "future"),
            text("posts/2021-01-02-wip.md", "---\ndraft: true\n---\nwip"),
        ];
        let config = config(r#"{"siteTitle": "T"}"#);

        let normal = process(&config, &files, Mode::Normal, today())?;
        let titles: Vec<&str> = normal.posts().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["Old"], titles);

        let draft = process(&config, &files, Mode::Draft, today())?;
        let titles: Vec<&str> = draft.posts().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["Future", "Wip", "Old"], titles);
        assert!(draft.posts().filter(|p| p.draft).count() == 2);
        Ok(())
    }

    #[test]
    fn test_aggregate_error() {
        let files = vec![
            text("posts/undated.md", "no date"),
            text("ok.md", "fine"),
            text("broken.md", "---\ntitle: [unclosed\n---\n"),
            text("posts/2021-01-01-tagged.md", "---\ntags: [Haskell]\n---\n"),
        ];
        let config = config(r#"{"siteTitle": "T", "tags": ["Elm"]}"#);
        let err = process(&config, &files, Mode::Normal, today()).unwrap_err();
        let paths: Vec<&Path> = err.problems.iter().map(|p| p.path.as_path()).collect();
        assert_eq!(
            vec![
                Path::new("posts/undated.md"),
                Path::new("broken.md"),
                Path::new("posts/2021-01-01-tagged.md"),
            ],
            paths
        );
        assert!(err.problems[2].message.contains("unknown tag `haskell`"));
        assert!(err.to_string().contains("posts/undated.md"));
    }

    #[test]
    fn test_tags_sharing_a_page() {
        let files = vec![
            text("posts/2021-01-01-cpp.md", "---\ntags: [c++]\n---\nA"),
            text("posts/2021-01-02-csharp.md", "---\ntags: [c#]\n---\nB"),
            text("posts/2021-01-03-more-cpp.md", "---\ntags: [C++]\n---\nC"),
        ];
        let err = process(&config(r#"{"siteTitle": "T"}"#), &files, Mode::Normal, today())
            .unwrap_err();
        assert_eq!(1, err.problems.len());
        assert_eq!(Path::new("posts/2021-01-02-csharp.md"), err.problems[0].path);
        assert!(err.problems[0].message.contains("`c#`"));
        assert!(err.problems[0].message.contains("`c++`"));
    }

    #[test]
    fn test_slug_and_meta() -> Result<(), ProcessError> {
        let files = vec![text(
            "guide.md",
            "---\nslug: docs\nlayout: Guide\nauthor: Ada\n---\n",
        )];
        let site = process(&config(r#"{"siteTitle": "T"}"#), &files, Mode::Normal, today())?;
        let doc = site.files[0].document().unwrap();
        assert_eq!(Path::new("docs/index.html"), doc.output_path);
        assert_eq!("Guide", doc.layout);
        assert_eq!(
            Some(&serde_json::Value::String("Ada".to_owned())),
            doc.meta.get("author")
        );
        Ok(())
    }

    #[test]
    fn test_url_of() {
        assert_eq!("/", url_of(Path::new("index.html")));
        assert_eq!("/a/b/", url_of(Path::new("a/b/index.html")));
    }

    #[test]
    fn test_humanize() {
        assert_eq!("About us", humanize("about-us"));
        assert_eq!("", humanize(""));
    }
}
