//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::chunking::SegmentMode;
use crate::config::DEFAULT_CONFIG_PATH;
use crate::ingest::InputType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ragline: retrieval-augmented assistant over local documents.
///
/// Splits input files into token-budgeted chunks, stores them in a local
/// vector store and answers questions with retrieved context and
/// conversation memory.
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the database file.
    ///
    /// Defaults to `.ragline/ragline.db` in the current directory.
    #[arg(short, long, env = "RAGLINE_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Path to the TOML configuration file.
    ///
    /// Defaults to `ragline.toml` in the current directory.
    #[arg(short, long, env = "RAGLINE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the database.
    ///
    /// Creates the database file and schema if they don't exist.
    Init {
        /// Force re-initialization (destroys existing data).
        #[arg(short, long)]
        force: bool,
    },

    /// Show store status.
    Status,

    /// Delete stored documents and/or memory.
    Reset {
        /// Only delete conversation memory.
        #[arg(long, conflicts_with = "documents")]
        memory: bool,

        /// Only delete ingested documents.
        #[arg(long)]
        documents: bool,

        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Segment a file and print the chunks without storing them.
    Chunk {
        /// Path to the input file.
        file: PathBuf,

        /// Segmentation mode (auto, by_blank_line, by_newline, by_fixed_chunk).
        #[arg(short, long)]
        mode: Option<SegmentMode>,

        /// Input type (auto, txt, md, json, pdf).
        #[arg(short = 't', long = "type")]
        input_type: Option<InputType>,

        /// Chunk size in characters.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Skip chunk length normalization.
        #[arg(long)]
        no_normalize: bool,
    },

    /// Segment a file and store its chunks.
    Ingest {
        /// Path to the input file.
        file: PathBuf,

        /// Segmentation mode (auto, by_blank_line, by_newline, by_fixed_chunk).
        #[arg(short, long)]
        mode: Option<SegmentMode>,

        /// Input type (auto, txt, md, json, pdf).
        #[arg(short = 't', long = "type")]
        input_type: Option<InputType>,
    },

    /// Retrieve stored chunks for a query.
    Search {
        /// Search query text.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Maximum cosine distance of a result.
        #[arg(long)]
        max_distance: Option<f32>,

        /// Token budget over the results.
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Answer a question from stored chunks and conversation memory.
    Ask {
        /// The question.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// List persisted conversation turns.
    Memory {
        /// Only show turns matching this regex (case-insensitive).
        #[arg(short, long)]
        filter: Option<String>,

        /// Show only the last N turns.
        #[arg(short = 'n', long)]
        last: Option<usize>,
    },

    /// Print the default configuration file.
    Config,
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }

    /// Returns the configuration path, using the default if not specified.
    #[must_use]
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}
