//! Command-line surface for ffbundle data/index pairs
//!
//! The binary in `main.rs` only parses arguments and sets up logging; every
//! subcommand lives in [`commands`] and writes its output to a caller-provided
//! writer so it can be exercised from tests.

pub mod commands;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use ffbundle_core::BundleConfig;
use std::io::Write;
use std::path::PathBuf;

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(
    name = "ffbundle",
    about = "Create, read and maintain ffindex-style file bundles",
    version,
    long_about = "A bundle is a data file holding many small files back to back plus a \
                  tab-separated index file naming each file's offset and length."
)]
pub struct Cli {
    #[command(flatten)]
    pub bundle: BundleArgs,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Location of the bundle to operate on.
#[derive(Debug, Clone, Args)]
pub struct BundleArgs {
    /// Data file
    #[arg(long, env = "FFBUNDLE_DATA", global = true)]
    pub data: Option<PathBuf>,

    /// Index file (defaults to the data file with an .ffindex extension)
    #[arg(long, env = "FFBUNDLE_INDEX", global = true)]
    pub index: Option<PathBuf>,
}

impl BundleArgs {
    /// Resolve the data and index paths.
    pub fn paths(&self) -> Result<(PathBuf, PathBuf)> {
        let Some(data) = self.data.clone() else {
            bail!("no data file given: pass --data or set FFBUNDLE_DATA");
        };
        let config = match &self.index {
            Some(index) => BundleConfig::new(&data, index),
            None => BundleConfig::for_data_file(&data),
        };
        Ok((config.data_path, config.index_path))
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add every file below a directory
    Pack {
        /// Directory to pack
        dir: PathBuf,

        /// Sort the index afterwards
        #[arg(long)]
        sort: bool,
    },

    /// List the files in the bundle
    List {
        /// Also print offset and stored length
        #[arg(short, long)]
        long: bool,
    },

    /// Write one file's content to stdout
    Cat {
        /// File name inside the bundle
        name: String,
    },

    /// Extract files into a directory
    Extract {
        /// Target directory
        dir: PathBuf,

        /// Files to extract (all if omitted)
        names: Vec<String>,
    },

    /// Add a single file
    Add {
        /// Name to store the file under
        name: String,

        /// File to read the content from
        file: PathBuf,
    },

    /// Sort the index file by name
    Sort,

    /// Remove files from the index (run `compact` to reclaim space)
    Unlink {
        /// File names to remove
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Rewrite the data file without unreferenced regions
    Compact,

    /// Append another bundle to this one
    Merge {
        /// Data file of the bundle to append
        #[arg(long)]
        other_data: PathBuf,

        /// Index file of the bundle to append
        #[arg(long)]
        other_index: PathBuf,
    },

    /// Show entry counts and space usage
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check every entry against the data file
    Verify,

    /// Measure read throughput
    Bench {
        /// Number of reads to perform
        #[arg(long, default_value_t = 100_000)]
        reads: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Run a parsed command, writing its output to `out`.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let (data, index) = cli.bundle.paths()?;

    match cli.command {
        Commands::Pack { dir, sort } => commands::pack::run(&data, &index, &dir, sort, out),
        Commands::List { long } => commands::read::list(&data, &index, long, out),
        Commands::Cat { name } => commands::read::cat(&data, &index, &name, out),
        Commands::Extract { dir, names } => {
            commands::read::extract(&data, &index, &dir, &names, out)
        }
        Commands::Add { name, file } => commands::write::add(&data, &index, &name, &file, out),
        Commands::Sort => commands::maintain::sort(&index, out),
        Commands::Unlink { names } => commands::maintain::unlink(&index, &names, out),
        Commands::Compact => commands::maintain::compact(&data, &index, out),
        Commands::Merge {
            other_data,
            other_index,
        } => commands::maintain::merge(&data, &index, &other_data, &other_index, out),
        Commands::Stats { json } => commands::maintain::stats(&data, &index, json, out),
        Commands::Verify => commands::maintain::verify(&data, &index, out),
        Commands::Bench { reads, json } => commands::bench::run(&data, &index, reads, json, out),
    }
}
