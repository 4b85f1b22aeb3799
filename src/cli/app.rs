use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mybinlog")]
#[command(about = "MySQL binary log decoding toolkit")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Log record boundaries and table maps to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode every event in a binlog file
    Events {
        /// Path to binlog file (e.g. mysql-bin.000001)
        #[arg(short, long)]
        file: String,

        /// Output one JSON object per event
        #[arg(long)]
        json: bool,

        /// Stop after this many events
        #[arg(short = 'n', long)]
        limit: Option<u64>,

        /// Abort on the first event that fails to decode instead of skipping it
        #[arg(long)]
        strict: bool,
    },

    /// Show the format descriptor and a count of events by type
    Info {
        /// Path to binlog file (e.g. mysql-bin.000001)
        #[arg(short, long)]
        file: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
