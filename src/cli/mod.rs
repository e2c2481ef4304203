//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vecsearch",
    version,
    about = "Semantic vector search over a product catalog",
    long_about = "Vecsearch maintains an embedding index over catalog items and answers \
                  nearest-neighbor queries by cosine similarity. Embeddings come from a \
                  pluggable provider (embedding service or OpenAI-style API) and are stored \
                  in SQLite with either a binary vector column or a JSON fallback."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/vecsearch/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index all catalog items for vector search
    Index {
        /// Number of items to process in each batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Force reindexing even if embeddings already exist
        #[arg(short, long)]
        force: bool,
    },

    /// Run a similarity search against the index
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Similarity threshold (0.0 - 1.0)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Delete all embedding records
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show index and provider status
    Status,

    /// Show storage engine and backend diagnostics
    Debug,

    /// Import catalog items from a JSON file
    Import {
        /// Path to a JSON array of items
        file: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
