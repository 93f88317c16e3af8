//! This module defines the command-line interface (CLI) for versefind.
//! It uses the `clap` crate to parse arguments and the optional one-shot
//! `lookup` subcommand.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// versefind: type a partial or misspelled scripture reference and see the
/// best matching verse as you type.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Turn on verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (defaults to the per-user config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Scripture text to search
    #[arg(long, value_name = "PATH")]
    pub bible: Option<PathBuf>,

    /// Two-column CSV of book abbreviations
    #[arg(long, value_name = "PATH")]
    pub abbreviations: Option<PathBuf>,

    /// File saved verses are appended to
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Column width verse text is wrapped to
    #[arg(short, long, value_name = "N")]
    pub width: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolves a single reference and prints it without entering the
    /// interactive session.
    #[command(arg_required_else_help = true)]
    Lookup {
        /// The reference, e.g. "jn 3:16". Multiple words are joined.
        #[arg(required = true, num_args = 1..)]
        reference: Vec<String>,
        /// Also append the verse to the output file.
        #[arg(short, long)]
        save: bool,
    },
}
