use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stroop Locker
///
/// Guards chosen apps behind a Stroop color challenge: name the ink color,
/// not the word, to get in.
#[derive(Parser, Debug)]
#[command(name = "stroop-locker")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding settings, locked apps and stats
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Require a challenge before opening an app
    Lock {
        /// Package name, e.g. com.instagram.android
        package: String,
    },
    /// Stop requiring a challenge for an app
    Unlock {
        package: String,
    },
    /// List locked apps
    List,
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Show challenge statistics
    Stats {
        /// Reset the counters to zero
        #[arg(long)]
        reset: bool,
    },
    /// Generate a single challenge and print it
    Challenge {
        /// Seed for a reproducible challenge
        #[arg(long)]
        seed: Option<u64>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Feed foreground app changes from stdin and answer challenges interactively
    Simulate {
        /// Seed for reproducible challenges
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print every setting
    Show,
    /// Change one setting
    Set {
        /// Setting name, e.g. challenges_required
        key: String,
        value: String,
    },
}
