//! Compiles the layout definitions in `_layouts/` into a [`Layouts`] set.
//! When the configuration names an external compiler, it's run first with
//! the layout files as arguments so it can regenerate or check them; any
//! failure aborts the run.

use crate::config::SiteConfig;
use gtmpl::Template;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The directory, relative to the site root, holding layout definitions.
pub const LAYOUTS_DIR: &str = "_layouts";

/// The reserved layout which wraps every other layout. It isn't a layout in
/// its own right, so content can't select it.
pub const BASE_LAYOUT: &str = "Base";

/// The extension of layout files.
pub const LAYOUT_EXTENSION: &str = "html";

/// The compiled layouts. Each layout has been parsed once to prove it's
/// valid; renders parse their own copy from the retained source so no
/// template state is shared between files.
#[derive(Debug, Clone, Default)]
pub struct Layouts {
    layouts: BTreeMap<String, String>,
    base: Option<String>,
}

impl Layouts {
    /// Builds a layout set from `(name, source)` pairs, parsing each one.
    /// A layout named [`BASE_LAYOUT`] becomes the wrapper.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Layouts>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut layouts = Layouts::default();
        for (name, source) in sources {
            let (name, source) = (name.into(), source.into());
            parse(&source).map_err(|err| Error::Parse {
                layout: name.clone(),
                err,
            })?;
            if name == BASE_LAYOUT {
                layouts.base = Some(source);
            } else {
                layouts.layouts.insert(name, source);
            }
        }
        Ok(layouts)
    }

    /// Returns the source of the layout called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.layouts.get(name).map(|s| s.as_str())
    }

    /// Returns the source of the [`BASE_LAYOUT`] wrapper, if any.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// The names of the selectable layouts, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(|s| s.as_str())
    }
}

/// Parses template source into a fresh [`Template`].
pub fn parse(source: &str) -> std::result::Result<Template, String> {
    let mut template = Template::default();
    template.parse(source)?;
    Ok(template)
}

/// Compiles the layouts of the site at `root`. Runs the configured external
/// compiler (if any) and then parses every `_layouts/*.html` file. Blocks
/// until done.
pub fn compile(root: &Path, config: &SiteConfig) -> Result<Layouts> {
    let files = layout_files(&root.join(LAYOUTS_DIR))?;

    if let Some(compiler) = &config.compiler {
        let inputs: Vec<&PathBuf> = files
            .iter()
            .filter(|(name, _)| name != BASE_LAYOUT)
            .map(|(_, path)| path)
            .collect();
        run_compiler(root, compiler, &config.compiler_args, &inputs)?;
    }

    let mut sources = Vec::with_capacity(files.len());
    for (name, path) in files {
        let source = std::fs::read_to_string(&path).map_err(|err| Error::Read {
            path: path.clone(),
            err,
        })?;
        sources.push((name, source));
    }

    let layouts = Layouts::from_sources(sources)?;
    log::info!(
        "compiled layouts: {}",
        layouts.names().collect::<Vec<_>>().join(", ")
    );
    Ok(layouts)
}

// Returns `(layout name, path)` for every layout file in `dir`, sorted by
// name.
fn layout_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|err| Error::Read {
        path: dir.to_owned(),
        err,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| Error::Read {
            path: dir.to_owned(),
            err,
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != LAYOUT_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem() {
            files.push((stem.to_string_lossy().into_owned(), path));
        }
    }
    files.sort();
    Ok(files)
}

// Runs the external compiler with inherited stdio so its diagnostics reach
// the user directly.
fn run_compiler(root: &Path, compiler: &Path, args: &[String], inputs: &[&PathBuf]) -> Result<()> {
    let mut command = Command::new(compiler);
    command.current_dir(root).args(args).args(inputs);

    log::info!(
        "  $ {} {}",
        compiler.display(),
        args.iter()
            .map(|a| a.to_owned())
            .chain(inputs.iter().map(|p| p.display().to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    );

    let status = command.status().map_err(|err| Error::Spawn {
        compiler: compiler.to_owned(),
        err,
    })?;
    if !status.success() {
        return Err(Error::Failed {
            compiler: compiler.to_owned(),
            code: status.code(),
        });
    }
    Ok(())
}

/// The result of compiling layouts.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to compile the layouts.
#[derive(Debug)]
pub enum Error {
    /// Returned when the layouts directory or a layout file can't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when the external compiler can't be started.
    Spawn {
        compiler: PathBuf,
        err: std::io::Error,
    },

    /// Returned when the external compiler exits unsuccessfully. `code` is
    /// `None` if it was killed by a signal.
    Failed { compiler: PathBuf, code: Option<i32> },

    /// Returned when a layout isn't a valid template.
    Parse { layout: String, err: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read { path, err } => {
                write!(f, "Reading layouts from `{}`: {}", path.display(), err)
            }
            Error::Spawn { compiler, err } => {
                write!(f, "Running compiler `{}`: {}", compiler.display(), err)
            }
            Error::Failed {
                compiler,
                code: Some(code),
            } => write!(
                f,
                "Compiler `{}` exited with status {}",
                compiler.display(),
                code
            ),
            Error::Failed {
                compiler,
                code: None,
            } => write!(
                f,
                "Compiler `{}` was terminated by a signal",
                compiler.display()
            ),
            Error::Parse { layout, err } => {
                write!(f, "Parsing layout `{}`: {}", layout, err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { err, .. } => Some(err),
            Error::Spawn { err, .. } => Some(err),
            Error::Failed { .. } => None,
            Error::Parse { .. } => None,
        }
    }
}
