use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Command-line arguments for the wordlens client
#[derive(Debug, Parser)]
#[command(
    name = "wordlens",
    version,
    about = "Query a word-embedding service for embeddings, nearest neighbors and images"
)]
pub struct Cli {
    /// Service base URL, overriding `base_url` in config.toml
    #[arg(long, env = "WORDLENS_BASE_URL", global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory holding config.toml and settings.toml
    #[arg(long, env = "WORDLENS_HOME", global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Action to run
    #[command(subcommand)]
    pub command: Command,
}

/// Actions the client can perform
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find the nearest neighbors of one or more words and fetch their images
    Nearest {
        /// Query words
        #[arg(required = true)]
        words: Vec<String>,
        /// Number of neighbors (1-20); unreadable values fall back to the default
        #[arg(short = 'n', long)]
        limit: Option<String>,
        /// Write neighbor images into this directory
        #[arg(long, value_name = "DIR")]
        save_images: Option<PathBuf>,
    },
    /// Show the embedding of each query word
    Embed {
        /// Query words
        #[arg(required = true)]
        words: Vec<String>,
        /// Print every component instead of a preview
        #[arg(long)]
        full: bool,
    },
    /// Fetch the image chosen for a query
    Image {
        /// Query words
        #[arg(required = true)]
        words: Vec<String>,
        /// Write the image to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Fetch images for several words in one request
    BulkImages {
        /// Words to fetch images for
        #[arg(required = true)]
        words: Vec<String>,
        /// Write the images into this directory
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Manage the stored API key
    Key {
        /// Key operation
        #[command(subcommand)]
        action: KeyAction,
    },
}

/// Operations on the stored API key
#[derive(Debug, Subcommand)]
pub enum KeyAction {
    /// Store a key in local settings
    Set {
        /// The API key
        key: String,
    },
    /// Show the active key (masked) and where it comes from
    Show,
    /// Remove the key from local settings
    Clear,
}
