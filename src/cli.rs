use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate UI strings through the cache
    Translate {
        /// Target language code (e.g. es, zh-Hans)
        #[arg(short, long)]
        lang: String,

        /// Wait for background requests and print the healed results too
        #[arg(long)]
        settle: bool,

        /// Strings to translate
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Switch language and prewarm the common UI strings
    Prewarm {
        /// Target language code
        #[arg(short, long)]
        lang: String,
    },

    /// List the languages the UI can be switched to
    Languages,

    /// Manage the translation bridge server
    Bridge {
        #[command(subcommand)]
        action: BridgeAction,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output path
        #[arg(default_value = "lingo-cache.toml")]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum BridgeAction {
    /// Check whether the bridge answers its health probe
    Status,

    /// Start the bridge and keep it running until Ctrl-C
    Run,
}
