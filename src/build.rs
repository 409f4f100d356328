//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading the configuration
//! ([`crate::config`]), compiling the layouts ([`crate::compiler`]), reading
//! and processing the content ([`crate::reader`], [`crate::processor`]),
//! rendering and writing every file on a pool of workers
//! ([`crate::render`], [`crate::write`]), and generating the Atom feed.

use crate::compiler::{self, Error as CompileError};
use crate::config::{Error as ConfigError, SiteConfig};
use crate::feed::{self, Error as FeedError, FeedConfig};
use crate::file::ProcessedFile;
use crate::processor::{self, Mode, ProcessError, Site};
use crate::reader::{self, Error as ReadError};
use crate::render::{render_document, LayoutEngine, RenderFailure, TemplateEngine};
use crate::write::{self, Error as WriteError};
use chrono::{NaiveDate, Utc};
use crossbeam_channel::unbounded;
use log::{debug, error, info};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread;

/// Options for a single build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    pub mode: Mode,

    /// Overrides the configured number of render workers.
    pub threads: Option<usize>,

    /// The date future-dated posts are compared against. Defaults to the
    /// current UTC date.
    pub today: Option<NaiveDate>,
}

impl Options {
    pub fn new(mode: Mode) -> Options {
        Options {
            mode,
            threads: None,
            today: None,
        }
    }
}

/// What a successful build produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Pages and posts rendered, generated listings included.
    pub rendered: usize,

    /// Static files copied from the content directory.
    pub copied: usize,

    /// Files copied by the `copy` rules.
    pub passed_through: usize,

    /// The path of the feed, if one was written.
    pub feed: Option<PathBuf>,
}

/// Builds the site rooted at `root`. This loads `config.json`, compiles the
/// layouts with [`compiler::compile`], and hands off to [`build_with_engine`]
/// which does the heavy lifting.
pub fn build_site(root: &Path, options: Options) -> Result<Summary> {
    let config = SiteConfig::load(root)?;
    let layouts = compiler::compile(root, &config)?;
    build_with_engine(root, &config, &TemplateEngine::new(layouts), options)
}

/// Builds the site rooted at `root` using `engine` for every page and post.
///
/// Nothing is written unless every content file processes cleanly. Once
/// rendering starts, a file that fails to render doesn't stop its siblings;
/// the failures are reported together as [`Error::Render`] after every file
/// has been attempted.
pub fn build_with_engine(
    root: &Path,
    config: &SiteConfig,
    engine: &dyn LayoutEngine,
    options: Options,
) -> Result<Summary> {
    let files = reader::read_content(root, config)?;
    debug!("Read {} content files", files.len());

    let today = options.today.unwrap_or_else(|| Utc::now().date_naive());
    let site = processor::process(config, &files, options.mode, today)?;

    let output_dir = root.join(&config.output_dir);
    let threads = match options.threads {
        Some(n) if n > 0 => n,
        _ => config.worker_count(),
    };

    let mut summary = Summary::default();
    let mut failures = Vec::new();
    let mut write_errors = Vec::new();
    for outcome in run_jobs(root, &output_dir, engine, &site, threads) {
        match outcome {
            Outcome::Rendered(path) => {
                debug!("Wrote {}", path.display());
                summary.rendered += 1;
            }
            Outcome::Copied(path) => {
                debug!("Copied {}", path.display());
                summary.copied += 1;
            }
            Outcome::Failed(failure) => {
                error!("{}", failure);
                failures.push(failure);
            }
            Outcome::WriteFailed(err) => {
                error!("{}", err);
                write_errors.push(err);
            }
        }
    }

    if let Some(settings) = &config.feed {
        let path = output_dir.join(&settings.path);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        feed::write_feed(
            &FeedConfig {
                settings,
                site_title: &config.site_title,
            },
            site.posts(),
            BufWriter::new(File::create(&path)?),
        )?;
        summary.feed = Some(path);
    }

    summary.passed_through = write::copy_rules(root, &output_dir, &config.copy)?;

    if !write_errors.is_empty() {
        return Err(Error::Files {
            render: failures,
            write: write_errors,
        });
    }
    if !failures.is_empty() {
        return Err(Error::Render(failures));
    }

    info!(
        "Built {} pages and copied {} files into {}",
        summary.rendered,
        summary.copied + summary.passed_through,
        output_dir.display()
    );
    Ok(summary)
}

// The result of one job. Every job reports exactly one outcome.
enum Outcome {
    Rendered(PathBuf),
    Copied(PathBuf),
    Failed(RenderFailure),
    WriteFailed(WriteError),
}

// Feeds every file in `site` to `threads` workers and collects their
// outcomes in completion order.
fn run_jobs(
    root: &Path,
    output_dir: &Path,
    engine: &dyn LayoutEngine,
    site: &Site,
    threads: usize,
) -> Vec<Outcome> {
    let (job_tx, job_rx) = unbounded::<&ProcessedFile>();
    let (out_tx, out_rx) = unbounded::<Outcome>();

    thread::scope(|scope| {
        for _ in 0..threads.max(1) {
            let job_rx = job_rx.clone();
            let out_tx = out_tx.clone();
            scope.spawn(move || {
                for file in job_rx {
                    // The receiving end lives until the scope ends.
                    let _ = out_tx.send(run_job(root, output_dir, engine, site, file));
                }
            });
        }
        drop(out_tx);

        for file in &site.files {
            // Workers only stop once the sender is dropped.
            let _ = job_tx.send(file);
        }
        drop(job_tx);

        out_rx.iter().collect()
    })
}

fn run_job(
    root: &Path,
    output_dir: &Path,
    engine: &dyn LayoutEngine,
    site: &Site,
    file: &ProcessedFile,
) -> Outcome {
    match file {
        ProcessedFile::Static(file) => match write::copy_static(root, output_dir, file) {
            Ok(()) => Outcome::Copied(file.dest.clone()),
            Err(err) => Outcome::WriteFailed(err),
        },
        ProcessedFile::Page(doc) | ProcessedFile::Post(doc) => {
            match render_document(engine, &site.info, doc) {
                Ok(page) => match write::write_page(output_dir, &page) {
                    Ok(()) => Outcome::Rendered(page.output_path),
                    Err(err) => Outcome::WriteFailed(err),
                },
                Err(failure) => Outcome::Failed(failure),
            }
        }
    }
}

/// The result of a build.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Everything up to and including
/// processing fails before any output is written.
#[derive(Debug)]
pub enum Error {
    /// Returned when `config.json` is missing or malformed.
    Config(ConfigError),

    /// Returned when the layouts fail to compile.
    Compile(CompileError),

    /// Returned when the content directory can't be read.
    Read(ReadError),

    /// Returned when one or more content files are malformed.
    Process(ProcessError),

    /// Returned when one or more documents failed to render. Every other
    /// file was still written.
    Render(Vec<RenderFailure>),

    /// Returned when rendered pages or static files couldn't be written.
    /// Any render failures from the same run are carried along so every
    /// failed file is named.
    Files {
        render: Vec<RenderFailure>,
        write: Vec<WriteError>,
    },

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for errors applying the `copy` rules.
    Write(WriteError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => err.fmt(f),
            Error::Compile(err) => err.fmt(f),
            Error::Read(err) => err.fmt(f),
            Error::Process(err) => err.fmt(f),
            Error::Render(failures) => {
                write!(f, "{} file(s) failed to render", failures.len())?;
                for failure in failures {
                    write!(f, "\n    {}", failure)?;
                }
                Ok(())
            }
            Error::Files { render, write } => {
                write!(
                    f,
                    "{} file(s) failed to write and {} failed to render",
                    write.len(),
                    render.len()
                )?;
                for err in write {
                    write!(f, "\n    {}", err)?;
                }
                for failure in render {
                    write!(f, "\n    {}", failure)?;
                }
                Ok(())
            }
            Error::Feed(err) => write!(f, "Writing feed: {}", err),
            Error::Write(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::Compile(err) => Some(err),
            Error::Read(err) => Some(err),
            Error::Process(err) => Some(err),
            Error::Render(failures) => failures
                .first()
                .map(|f| f as &(dyn std::error::Error + 'static)),
            Error::Files { write, .. } => write
                .first()
                .map(|e| e as &(dyn std::error::Error + 'static)),
            Error::Feed(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Error {
        Error::Compile(err)
    }
}

impl From<ReadError> for Error {
    fn from(err: ReadError) -> Error {
        Error::Read(err)
    }
}

impl From<ProcessError> for Error {
    fn from(err: ProcessError) -> Error {
        Error::Process(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
