//! Command-line interface for clonevoice
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Voice chat with your AI clone
#[derive(Parser, Debug)]
#[command(name = "clonevoice", version, about = "Voice chat with your AI clone")]
pub struct Cli {
    /// Subcommand to execute (default: voice)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug logs, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Backend base URL override (e.g., http://localhost:8000)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,
}

/// Parse a per-character speaking pace.
///
/// Bare numbers are milliseconds; anything else goes through `humantime`
/// (`40ms`, `1s`).
pub fn parse_pace(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hands-free conversation (type lines as speech, :stop / :start / :q)
    Voice {
        /// Talk to a clone (id or name) instead of the assistant
        #[arg(long, value_name = "CLONE")]
        clone: Option<String>,

        /// Simulated speaking time per character (e.g., 40ms)
        #[arg(long, value_name = "DURATION", value_parser = parse_pace)]
        pace: Option<Duration>,
    },

    /// Send one text message and print the reply
    Chat {
        /// Message text (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Show or clear the backend conversation history
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// View and edit the assistant profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },

    /// Manage personal clones
    Clones {
        #[command(subcommand)]
        action: ClonesAction,
    },

    /// Upload an image or document, optionally asking about it
    Upload {
        /// File to upload
        file: PathBuf,

        /// Question about the file
        #[arg(long, value_name = "TEXT")]
        query: Option<String>,

        /// Endpoint to use (default: guessed from the extension)
        #[arg(long, value_enum)]
        kind: Option<UploadKindArg>,
    },

    /// Check that the backend is reachable
    Health,

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UploadKindArg {
    Image,
    Document,
}

/// History actions
#[derive(Subcommand, Debug, PartialEq)]
pub enum HistoryAction {
    /// Print past exchanges (default)
    Show {
        /// Only the most recent N exchanges
        #[arg(long, short = 'n', value_name = "N")]
        limit: Option<usize>,
    },
    /// Delete all history on the backend
    Clear,
}

/// Profile actions
#[derive(Subcommand, Debug, PartialEq)]
pub enum ProfileAction {
    /// Print the profile (default)
    Show,
    /// Change one field (name, avatar, status, description, personality, color)
    Set { field: String, value: String },
}

/// Clone management actions
#[derive(Subcommand, Debug, PartialEq)]
pub enum ClonesAction {
    /// List all clones
    List,
    /// Show one clone by id
    Show { id: String },
    /// Find a clone by name
    Find { name: String },
    /// Create a clone interactively
    Create {
        /// Raw RGBA frame to sample face colours from
        #[arg(long, value_name = "FILE", requires_all = ["width", "height"])]
        face: Option<PathBuf>,
        /// Frame width in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Frame height in pixels
        #[arg(long)]
        height: Option<u32>,
    },
    /// Delete a clone
    Delete { id: String },
    /// Show conversation statistics for a clone
    Stats { id: String },
    /// Sample face colours from a raw RGBA frame without creating a clone
    Analyze {
        file: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Get a configuration value by key (e.g., backend.url)
    Get {
        /// Dotted key path (e.g., backend.url, session.speech_settle_ms)
        key: String,
    },
    /// Set a configuration value by key
    Set {
        /// Dotted key path (e.g., backend.url, voice.locale)
        key: String,
        /// Value to set
        value: String,
    },
    /// List current configuration values
    List,
    /// Print the configuration file path
    Path,
}
