//! Discovers the files in the content directory and reads the ones the
//! configuration marks as content.

use crate::config::SiteConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The directory, relative to the site root, whose files are treated as
/// posts when it exists ("blog mode").
pub const BLOG_POSTS_DIR: &str = "_posts";

/// A file found under the content directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFile {
    /// The path relative to the content directory, e.g. `posts/hello.md`.
    pub path: PathBuf,

    /// Where the file was read from, relative to the site root.
    pub origin: PathBuf,

    /// The file contents.
    pub source: Source,
}

/// The contents of a [`RawFile`].
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// The decoded text of a content file.
    Text(String),

    /// A pass-through file. Its bytes are copied verbatim at write time.
    Asset,
}

impl RawFile {
    /// The file's extension, lowercased, or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// Reads every file under the content directory of the site at `root`,
/// recursively, in path order. Files whose extension is listed in
/// [`SiteConfig::content_extensions`] are decoded as text; the rest are
/// returned as [`Source::Asset`]. When `{root}/_posts` exists its files are
/// included as if they lived under the posts directory, and the content
/// directory itself becomes optional.
pub fn read_content(root: &Path, config: &SiteConfig) -> Result<Vec<RawFile>> {
    let blog_posts = root.join(BLOG_POSTS_DIR);
    let mut files = if blog_posts.is_dir() && !root.join(&config.content_dir).exists() {
        Vec::new()
    } else {
        read_dir(root, &config.content_dir, Path::new(""), config)?
    };

    if blog_posts.is_dir() {
        files.extend(read_dir(
            root,
            Path::new(BLOG_POSTS_DIR),
            &config.posts_dir,
            config,
        )?);
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn read_dir(root: &Path, dir: &Path, prefix: &Path, config: &SiteConfig) -> Result<Vec<RawFile>> {
    let abs = root.join(dir);
    if !abs.is_dir() {
        return Err(Error::MissingRoot(abs));
    }

    let mut files = Vec::new();
    for result in WalkDir::new(&abs).sort_by_file_name() {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }

        // strip_prefix() can't fail since `abs` is the walk root
        let relative = match entry.path().strip_prefix(&abs) {
            Ok(relative) => relative,
            Err(_) => continue,
        };

        let mut file = RawFile {
            path: prefix.join(relative),
            origin: dir.join(relative),
            source: Source::Asset,
        };
        if config.is_content_extension(&file.extension()) {
            let bytes = std::fs::read(entry.path()).map_err(|err| Error::Io {
                path: entry.path().to_owned(),
                err,
            })?;
            let text = String::from_utf8(bytes)
                .map_err(|_| Error::InvalidUtf8(entry.path().to_owned()))?;
            file.source = Source::Text(text);
        }
        files.push(file);
    }

    log::debug!("read {} files from {}", files.len(), abs.display());
    Ok(files)
}

/// The result of reading content.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading the content directory.
#[derive(Debug)]
pub enum Error {
    /// Returned when the content directory doesn't exist.
    MissingRoot(PathBuf),

    /// Returned when a content file isn't valid UTF-8.
    InvalidUtf8(PathBuf),

    /// Returned when a content file can't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned for errors walking the content directory.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingRoot(path) => {
                write!(f, "Content directory `{}` is missing", path.display())
            }
            Error::InvalidUtf8(path) => {
                write!(f, "Content file `{}` is not valid UTF-8", path.display())
            }
            Error::Io { path, err } => {
                write!(f, "Reading `{}`: {}", path.display(), err)
            }
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingRoot(_) => None,
            Error::InvalidUtf8(_) => None,
            Error::Io { err, .. } => Some(err),
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator while walking directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn config() -> SiteConfig {
        SiteConfig::from_json(r#"{"siteTitle": "Test"}"#).unwrap()
    }

    #[test]
    fn test_read_content() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(content.join("posts")).unwrap();
        fs::write(content.join("about.md"), "# About").unwrap();
        fs::write(content.join("logo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();
        fs::write(content.join("posts/2020-01-01-hi.md"), "hi").unwrap();

        let files = read_content(dir.path(), &config())?;
        let paths: Vec<&Path> = files.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(
            vec![
                Path::new("about.md"),
                Path::new("logo.png"),
                Path::new("posts/2020-01-01-hi.md"),
            ],
            paths
        );
        assert_eq!(Source::Text("# About".to_owned()), files[0].source);
        assert_eq!(Source::Asset, files[1].source);
        assert_eq!(Path::new("content/logo.png"), files[1].origin);
        Ok(())
    }

    #[test]
    fn test_blog_mode() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::create_dir_all(dir.path().join(BLOG_POSTS_DIR)).unwrap();
        fs::write(dir.path().join("_posts/2020-01-01-hi.md"), "hi").unwrap();

        let files = read_content(dir.path(), &config())?;
        assert_eq!(1, files.len());
        assert_eq!(Path::new("posts/2020-01-01-hi.md"), files[0].path);
        assert_eq!(Path::new("_posts/2020-01-01-hi.md"), files[0].origin);
        Ok(())
    }

    #[test]
    fn test_blog_without_content_dir() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(BLOG_POSTS_DIR)).unwrap();
        fs::write(dir.path().join("_posts/2020-01-01-hi.md"), "hi").unwrap();
        assert_eq!(1, read_content(dir.path(), &config())?.len());
        Ok(())
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        match read_content(dir.path(), &config()) {
            Err(Error::MissingRoot(path)) => assert!(path.ends_with("content")),
            other => panic!("expected Error::MissingRoot, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(&content).unwrap();
        fs::write(content.join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            read_content(dir.path(), &config()),
            Err(Error::InvalidUtf8(_))
        ));
    }
}
