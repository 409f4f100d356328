//! Defines [`SiteConfig`], the site-wide configuration loaded once per run
//! from `config.json` in the site root.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The name of the configuration file expected in the site root.
pub const CONFIG_FILE: &str = "config.json";

/// The site configuration. Field names map to camelCase keys in
/// `config.json` (e.g., `output_dir` is read from `outputDir`). Keys that
/// aren't recognized are kept in [`SiteConfig::extra`] and handed to layouts
/// untouched.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// The title of the site.
    pub site_title: String,

    /// The directory (relative to the site root) rendered files are written
    /// to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// The directory (relative to the site root) holding the content files.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// The directory (relative to the content directory) whose files are
    /// posts rather than pages.
    #[serde(default = "default_posts_dir")]
    pub posts_dir: PathBuf,

    /// File extensions which mark a file as content. Everything else is
    /// copied through verbatim. Extensions are stored without a leading dot.
    #[serde(
        default = "default_content_extensions",
        deserialize_with = "deserialize_extensions"
    )]
    pub content_extensions: Vec<String>,

    /// The optional allow-list of tags. When present, a post using any other
    /// tag fails processing. Tags are case-folded.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Option<Vec<String>>,

    /// Feed settings. No feed is generated without them.
    #[serde(default)]
    pub feed: Option<FeedSettings>,

    /// The external compiler executable run before layouts are loaded.
    #[serde(default, alias = "elm")]
    pub compiler: Option<PathBuf>,

    /// Extra arguments passed to [`SiteConfig::compiler`] ahead of the
    /// layout files.
    #[serde(default)]
    pub compiler_args: Vec<String>,

    /// Pass-through rules: source paths (relative to the site root) mapped
    /// to destinations (relative to the output directory).
    #[serde(default)]
    pub copy: BTreeMap<String, String>,

    /// The number of render workers. Defaults to the number of CPUs.
    #[serde(default)]
    pub threads: Option<usize>,

    /// Unrecognized keys.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Settings for the generated feed.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeedSettings {
    /// The feed title. Falls back to the site title.
    #[serde(default)]
    pub title: Option<String>,

    /// The public base URL of the site, e.g. `https://example.org/`. Post
    /// URLs are joined onto it.
    pub link: url::Url,

    /// A description of the feed.
    #[serde(default)]
    pub description: Option<String>,

    /// The feed author.
    #[serde(default)]
    pub author: Option<Author>,

    /// The location of the feed relative to the output directory.
    #[serde(default = "default_feed_path")]
    pub path: PathBuf,
}

/// The author of a feed.
#[derive(Deserialize, Debug, Clone)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_posts_dir() -> PathBuf {
    PathBuf::from("posts")
}

fn default_content_extensions() -> Vec<String> {
    vec!["md".to_owned(), "html".to_owned()]
}

fn default_feed_path() -> PathBuf {
    PathBuf::from("feed.xml")
}

fn deserialize_extensions<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(v.iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect())
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(v.map(|tags| tags.iter().map(|t| crate::tag::fold(t)).collect()))
}

impl SiteConfig {
    /// Loads `config.json` from the site `root`. A missing file is reported
    /// as [`Error::Missing`] so the caller can point the user at
    /// `quire init`.
    pub fn load(root: &Path) -> Result<SiteConfig> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Err(Error::Missing(path));
        }
        let file = File::open(&path).map_err(|err| Error::Open {
            path: path.clone(),
            err,
        })?;
        serde_json::from_reader(file).map_err(|err| Error::Parse { path, err })
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(input: &str) -> serde_json::Result<SiteConfig> {
        serde_json::from_str(input)
    }

    /// Returns true if a file with extension `ext` is a content file.
    pub fn is_content_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.content_extensions.iter().any(|e| *e == ext)
    }

    /// The number of render workers to use.
    pub fn worker_count(&self) -> usize {
        match self.threads {
            Some(n) if n > 0 => n,
            _ => num_cpus::get(),
        }
    }
}

/// The result of loading a configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading `config.json`.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is no configuration file in the site root.
    Missing(PathBuf),

    /// Returned when the configuration file exists but can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the configuration file isn't valid.
    Parse {
        path: PathBuf,
        err: serde_json::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Missing(_) => write!(
                f,
                "Couldn't find {}. Is this a new project? Run `quire init` to generate a scaffold.",
                CONFIG_FILE
            ),
            Error::Open { path, err } => {
                write!(f, "Opening configuration file `{}`: {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Parsing configuration file `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Missing(_) => None,
            Error::Open { err, .. } => Some(err),
            Error::Parse { err, .. } => Some(err),
        }
    }
}
