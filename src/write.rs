//! Writes rendered pages and copies static files into the output directory.
//! Destinations are overwritten and missing parent directories created.
//! Nothing is ever removed, so files left over from earlier runs stay put.

use crate::file::{RenderedPage, StaticFile};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Writes `page` to its output path under `output_dir`.
pub fn write_page(output_dir: &Path, page: &RenderedPage) -> Result<()> {
    let dest = output_dir.join(&page.output_path);
    create_parent(&dest)?;
    std::fs::write(&dest, &page.html).map_err(|err| Error::new(&dest, err))
}

/// Copies the bytes of a static `file` from the site at `root` to its
/// destination under `output_dir`.
pub fn copy_static(root: &Path, output_dir: &Path, file: &StaticFile) -> Result<()> {
    copy_file(&root.join(&file.origin), &output_dir.join(&file.dest))
}

/// Applies the `copy` rules from the configuration: each source (relative to
/// `root`) is copied to its destination (relative to `output_dir`).
/// Directories are copied recursively. Returns the number of files copied.
pub fn copy_rules<'a, I>(root: &Path, output_dir: &Path, rules: I) -> Result<usize>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut copied = 0;
    for (src, dst) in rules {
        let src = root.join(src);
        let dst = output_dir.join(dst);
        if src.is_dir() {
            copied += copy_dir(&src, &dst)?;
        } else {
            copy_file(&src, &dst)?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for result in WalkDir::new(src) {
        let entry = result.map_err(|err| {
            let path = err.path().unwrap_or(src).to_owned();
            Error {
                path,
                err: io::Error::from(err),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        // strip_prefix shouldn't fail since `src` is the walk root
        if let Ok(relative) = entry.path().strip_prefix(src) {
            copy_file(entry.path(), &dst.join(relative))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    create_parent(dst)?;
    std::fs::copy(src, dst)
        .map(|_| ())
        .map_err(|err| Error::new(src, err))
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) => std::fs::create_dir_all(dir).map_err(|err| Error::new(dir, err)),
        None => Ok(()),
    }
}

/// The result of a fallible write operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error writing or copying a file.
#[derive(Debug)]
pub struct Error {
    /// The path being written, copied, or created.
    pub path: PathBuf,
    pub err: io::Error,
}

impl Error {
    fn new(path: &Path, err: io::Error) -> Error {
        Error {
            path: path.to_owned(),
            err,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Writing `{}`: {}", self.path.display(), self.err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;

    #[test]
    fn test_write_page_overwrites() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let page = RenderedPage {
            output_path: PathBuf::from("a/b/index.html"),
            html: "<p>one</p>".to_owned(),
        };
        write_page(dir.path(), &page)?;
        write_page(
            dir.path(),
            &RenderedPage {
                html: "<p>two</p>".to_owned(),
                ..page
            },
        )?;
        assert_eq!(
            "<p>two</p>",
            fs::read_to_string(dir.path().join("a/b/index.html")).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_copy_static_is_byte_identical() -> Result<()> {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let bytes: Vec<u8> = (0..=255).collect();
        fs::create_dir_all(root.path().join("content/img")).unwrap();
        fs::write(root.path().join("content/img/x.bin"), &bytes).unwrap();

        copy_static(
            root.path(),
            out.path(),
            &StaticFile {
                source: PathBuf::from("img/x.bin"),
                origin: PathBuf::from("content/img/x.bin"),
                dest: PathBuf::from("img/x.bin"),
            },
        )?;
        assert_eq!(bytes, fs::read(out.path().join("img/x.bin")).unwrap());
        Ok(())
    }

    #[test]
    fn test_copy_rules() -> Result<()> {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("_resources/css")).unwrap();
        fs::write(root.path().join("_resources/css/site.css"), "body{}").unwrap();
        fs::write(root.path().join("CNAME"), "example.org").unwrap();

        let mut rules = BTreeMap::new();
        rules.insert("_resources".to_owned(), "resources".to_owned());
        rules.insert("CNAME".to_owned(), "CNAME".to_owned());
        assert_eq!(2, copy_rules(root.path(), out.path(), &rules)?);
        assert!(out.path().join("resources/css/site.css").is_file());
        assert!(out.path().join("CNAME").is_file());
        Ok(())
    }

    #[test]
    fn test_copy_missing_source() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut rules = BTreeMap::new();
        rules.insert("nope".to_owned(), "nope".to_owned());
        let err = copy_rules(root.path(), out.path(), &rules).unwrap_err();
        assert!(err.path.ends_with("nope"));
    }
}
