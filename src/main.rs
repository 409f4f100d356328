use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use log::warn;
use quire::build::{build_site, Options};
use quire::processor::Mode;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

/// Quire builds a static site from the `content` directory, rendering each
/// page and post through the layouts in `_layouts`.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// The site root, holding `config.json`.
    #[arg(short = 'C', long, default_value = ".")]
    root: PathBuf,

    /// The number of render workers. Overrides `threads` in `config.json`.
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Builds the site when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Builds the site, including drafts and future-dated posts.
    Draft,

    /// Writes a scaffold site into the site root.
    Init,

    #[command(external_subcommand)]
    Other(Vec<String>),
}

/// What the command line asks for.
#[derive(Debug, PartialEq)]
enum Invocation {
    Build { root: PathBuf, options: Options },
    Init { root: PathBuf },

    /// Print the text and exit successfully. Unrecognized commands, flags,
    /// and arguments all end up here with the usage help.
    Print(String),
}

fn invocation<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                return Invocation::Print(err.render().to_string())
            }
            kind => {
                warn!("{}", kind);
                return Invocation::Print(usage());
            }
        },
    };

    let mode = match cli.command {
        None => Mode::Normal,
        Some(Commands::Draft) => Mode::Draft,
        Some(Commands::Init) => return Invocation::Init { root: cli.root },
        Some(Commands::Other(args)) => {
            warn!("Unknown command `{}`", args.join(" "));
            return Invocation::Print(usage());
        }
    };
    Invocation::Build {
        root: cli.root,
        options: Options {
            threads: cli.threads,
            ..Options::new(mode)
        },
    }
}

fn usage() -> String {
    Cli::command().render_help().to_string()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match main_result() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn main_result() -> Result<()> {
    match invocation(std::env::args_os()) {
        Invocation::Build { root, options } => {
            build_site(&root, options)?;
        }
        Invocation::Init { root } => {
            quire::init::new_site(&root)?;
        }
        Invocation::Print(text) => print!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_invocations() {
        assert_eq!(
            Invocation::Build {
                root: PathBuf::from("."),
                options: Options::new(Mode::Normal),
            },
            invocation(["quire"])
        );
        assert_eq!(
            Invocation::Build {
                root: PathBuf::from("site"),
                options: Options {
                    threads: Some(2),
                    ..Options::new(Mode::Draft)
                },
            },
            invocation(["quire", "-C", "site", "-j", "2", "draft"])
        );
        assert_eq!(
            Invocation::Init {
                root: PathBuf::from(".")
            },
            invocation(["quire", "init"])
        );
    }

    #[test]
    fn test_anything_else_prints_usage() {
        for args in [
            vec!["quire", "foo"],
            vec!["quire", "--bogus"],
            vec!["quire", "draft", "extra"],
            vec!["quire", "-j", "many"],
        ] {
            match invocation(args.clone()) {
                Invocation::Print(text) => assert!(text.contains("Usage"), "{:?}", args),
                other => panic!("expected usage for {:?}, got {:?}", args, other),
            }
        }
    }

    #[test]
    fn test_help_and_version() {
        assert!(matches!(invocation(["quire", "--help"]), Invocation::Print(_)));
        assert!(matches!(invocation(["quire", "--version"]), Invocation::Print(_)));
    }
}
