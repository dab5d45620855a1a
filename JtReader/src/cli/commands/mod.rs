//! CLI commands

pub mod info;
pub mod tree;

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::import::ImportOptions;

/// Load options shared by all commands
#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// Decode the scene graph only, no shape geometry
    #[arg(long)]
    pub skip_geometry: bool,

    /// Do not load partitions that reference other JT files
    #[arg(long)]
    pub skip_sub_partitions: bool,

    /// Stop wiring children after the first multi-instance clone (legacy node lists)
    #[arg(long)]
    pub stop_after_clone: bool,

    /// Nesting limit for external references
    #[arg(long, default_value_t = crate::import::DEFAULT_MAX_REFERENCE_DEPTH)]
    pub max_reference_depth: usize,
}

impl LoadArgs {
    pub fn options(&self) -> ImportOptions {
        ImportOptions::new()
            .with_skip_geometry(self.skip_geometry)
            .with_skip_sub_partitions(self.skip_sub_partitions)
            .with_stop_after_clone(self.stop_after_clone)
            .with_max_reference_depth(self.max_reference_depth)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load JT files and print version, load information and model statistics
    Info {
        /// JT files to load (loaded in parallel)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        load: LoadArgs,

        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,

        /// Suppress progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the logical scene graph of a JT file as an indented tree
    Tree {
        /// JT file to load
        file: PathBuf,

        #[command(flatten)]
        load: LoadArgs,

        /// List the attributes of every node
        #[arg(long)]
        attributes: bool,

        /// List the properties of every node
        #[arg(long)]
        properties: bool,
    },
}

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if a file cannot be loaded.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Info {
                files,
                load,
                json,
                quiet,
            } => info::execute(files, &load.options(), *json, *quiet || *json),
            Commands::Tree {
                file,
                load,
                attributes,
                properties,
            } => tree::execute(file, &load.options(), *attributes, *properties),
        }
    }
}
