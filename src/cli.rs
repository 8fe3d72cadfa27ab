use audioprobe_common::AudioFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audioprobe")]
#[command(author, version, about = "Audio file inspection through ffmpeg")]
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
    /// Probe a single audio file
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// ffmpeg version identifier to use
        #[arg(long)]
        ffmpeg_version: Option<String>,

        /// Container format to assume if ffmpeg cannot identify one
        #[arg(long)]
        format: Option<AudioFormat>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe every audio file under a directory and write a CSV report
    Batch {
        /// Directory to scan
        #[arg(required = true)]
        dir: PathBuf,

        /// Report path (a directory with --split-folders)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ffmpeg version identifier to use
        #[arg(long)]
        ffmpeg_version: Option<String>,

        /// Files probed concurrently (0 = one per CPU)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// One report per immediate subdirectory
        #[arg(long)]
        split_folders: bool,
    },

    /// Probe one file with several ffmpeg versions
    Compare {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Version identifiers (default: every available version)
        #[arg(long, value_delimiter = ',')]
        versions: Vec<String>,
    },

    /// Check which ffmpeg versions are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,

    /// Audio service maintenance
    Service {
        /// Service base URL
        #[arg(long, env = "AUDIO_SERVICE_URL")]
        base_url: Option<String>,

        /// API key sent as X-Api-Key
        #[arg(long, env = "AUDIO_SERVICE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[command(subcommand)]
        command: ServiceCommands,
    },
}

#[derive(Subcommand)]
pub enum ServiceCommands {
    /// Show stored metadata for an audio checksum
    Metadata { checksum: String },

    /// Show a content item's cohort
    Cohort { content_id: String },

    /// Remove a cohort's playlist and version id so they are regenerated
    StripPlaylist { content_id: String },

    /// List the stored duration of every file in a cohort
    Durations { content_id: String },
}
