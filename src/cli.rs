use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "linkcast")]
#[command(author, version, about = "Stream media shared through chat deep links over HTTP")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming server
    Start {
        /// Host to bind to (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build a deep link and its watch/download URLs
    Link {
        #[command(flatten)]
        target: LinkTargetArgs,

        /// Message / object id inside the container
        #[arg(long)]
        object: u64,
    },

    /// Decode a deep link and show what it points at
    Parse {
        /// Deep link, e.g. https://t.me/c/123456789/10
        link: String,
    },

    /// Copy a file into the local upstream and print its share URLs
    Register {
        /// File to register
        file: PathBuf,

        /// Owner id the object is registered under
        #[arg(long)]
        owner: u64,

        /// Attachment kind: document, video, audio or photo
        #[arg(long, default_value = "document")]
        kind: String,

        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        /// Declared MIME type
        #[arg(long)]
        mime: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Exactly one container form for `link`.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct LinkTargetArgs {
    /// Private container suffix (the digits after /c/)
    #[arg(long)]
    pub private: Option<String>,

    /// Public container handle
    #[arg(long)]
    pub public: Option<String>,

    /// Owner id of a direct object link
    #[arg(long)]
    pub direct: Option<u64>,
}
