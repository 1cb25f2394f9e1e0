use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "collectforge")]
#[command(author, version, about = "Collection cataloging with pluggable item modules")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the import directory from the config
    #[arg(long, global = true)]
    pub import_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and manage item modules
    Modules {
        #[command(subcommand)]
        command: ModuleCommands,
    },

    /// Compile a module definition file and report every problem found
    Validate {
        /// Definition file to check
        #[arg(required = true)]
        file: PathBuf,
    },

    /// List registered lookup providers
    Providers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up item metadata through a module's providers
    Lookup {
        /// Module key
        module: String,

        /// Identifiers as TYPE:VALUE, e.g. ISBN:9780441013593
        #[arg(required = true)]
        identifiers: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum ModuleCommands {
    /// List registered modules
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one module's compiled contract
    Show {
        key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a module's definition as it was loaded
    Raw { key: String },

    /// Scan the import directory and report per-file outcomes
    Scan,

    /// Validate a definition and copy it into the import directory
    Import {
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Delete an imported module's definition file
    Remove { key: String },
}
