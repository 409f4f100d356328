//! Site initialization.
//!
//! Writes a small working site (configuration, layouts, and sample
//! content) into the site root.

use crate::config::CONFIG_FILE;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Files to write ignore patterns to
const IGNORE_FILE: &str = ".gitignore";

/// The scaffold, as paths relative to the site root and their contents.
const SCAFFOLD: &[(&str, &str)] = &[
    (CONFIG_FILE, include_str!("../scaffold/config.json")),
    (
        "_layouts/Base.html",
        include_str!("../scaffold/_layouts/Base.html"),
    ),
    (
        "_layouts/Page.html",
        include_str!("../scaffold/_layouts/Page.html"),
    ),
    (
        "_layouts/Post.html",
        include_str!("../scaffold/_layouts/Post.html"),
    ),
    (
        "_layouts/Posts.html",
        include_str!("../scaffold/_layouts/Posts.html"),
    ),
    (
        "_layouts/Tag.html",
        include_str!("../scaffold/_layouts/Tag.html"),
    ),
    (
        "content/index.md",
        include_str!("../scaffold/content/index.md"),
    ),
    (
        "content/about.md",
        include_str!("../scaffold/content/about.md"),
    ),
    (
        "content/posts/2019-01-01-hello.md",
        include_str!("../scaffold/content/posts/2019-01-01-hello.md"),
    ),
    (
        "content/styles.css",
        include_str!("../scaffold/content/styles.css"),
    ),
];

/// Writes the scaffold into `root`, returning the paths written.
///
/// Refuses to run if `root` already has a `config.json`. Other files that
/// already exist are left alone.
pub fn new_site(root: &Path) -> Result<Vec<PathBuf>> {
    let config = root.join(CONFIG_FILE);
    if config.exists() {
        bail!(
            "`{}` already exists. Is there a site here already?",
            config.display()
        );
    }

    let mut written = Vec::with_capacity(SCAFFOLD.len() + 1);
    for (relative, contents) in SCAFFOLD {
        let path = root.join(relative);
        if write_new(&path, contents)? {
            written.push(path);
        } else {
            warn!("Keeping existing `{}`", path.display());
        }
    }

    let ignore = root.join(IGNORE_FILE);
    if write_new(&ignore, "dist/\n")? {
        written.push(ignore);
    }

    info!("Created a new site in {}", root.display());
    Ok(written)
}

// Writes `contents` to `path` unless something is already there. Returns
// whether the file was written.
fn write_new(path: &Path, contents: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compiler::Layouts;
    use crate::config::SiteConfig;

    #[test]
    fn test_new_site() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let written = new_site(dir.path())?;
        assert_eq!(SCAFFOLD.len() + 1, written.len());
        assert!(dir.path().join("content/posts/2019-01-01-hello.md").is_file());

        let config = SiteConfig::load(dir.path())?;
        assert_eq!("My Quire Site", config.site_title);
        Ok(())
    }

    #[test]
    fn test_refuses_existing_site() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(CONFIG_FILE), "{}")?;
        assert!(new_site(dir.path()).is_err());
        assert_eq!("{}", fs::read_to_string(dir.path().join(CONFIG_FILE))?);
        assert!(!dir.path().join("_layouts").exists());
        Ok(())
    }

    #[test]
    fn test_keeps_existing_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("content"))?;
        fs::write(dir.path().join("content/about.md"), "mine")?;
        let written = new_site(dir.path())?;
        assert!(!written.contains(&dir.path().join("content/about.md")));
        assert_eq!("mine", fs::read_to_string(dir.path().join("content/about.md"))?);
        Ok(())
    }

    #[test]
    fn test_scaffold_layouts_parse() {
        let layouts = SCAFFOLD.iter().filter_map(|(path, source)| {
            let name = path.strip_prefix("_layouts/")?.strip_suffix(".html")?;
            Some((name, *source))
        });
        assert!(Layouts::from_sources(layouts).is_ok());
    }
}
