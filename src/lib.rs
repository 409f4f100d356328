//! The library code for the `quire` static site generator. A build runs in
//! a handful of steps, each owned by a module:
//!
//! 1. Loading `config.json` ([`crate::config`])
//! 2. Compiling the `_layouts` and running any external compiler
//!    ([`crate::compiler`])
//! 3. Reading the content directory ([`crate::reader`])
//! 4. Processing the raw files into pages, posts, static files, and
//!    generated listings ([`crate::processor`])
//! 5. Rendering every page and post through its layout and writing the
//!    results ([`crate::render`], [`crate::write`])
//! 6. Generating the Atom feed ([`crate::feed`])
//!
//! Steps 1 through 4 are all-or-nothing: a problem in any of them stops the
//! build before anything is written. Step 5 runs on a pool of workers
//! ([`crate::build`]) and a failure there is confined to the file that
//! caused it.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod compiler;
pub mod config;
pub mod feed;
pub mod file;
pub mod init;
pub mod markdown;
pub mod processor;
pub mod reader;
pub mod render;
pub mod tag;
pub mod value;
pub mod write;
