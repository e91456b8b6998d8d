use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use kinship_core::RelationshipCategory;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Grouped, human-readable listing
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser)]
#[command(name = "kinship")]
#[command(about = "kinship - related items for block-based notes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses the config file value
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (.toml, .yaml or .json)
    #[arg(short = 'C', long, global = true, env = "KINSHIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl Cli {
    /// Level forced on the command line, if any
    pub fn level_override(&self) -> Option<LevelFilter> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level.into()),
            (None, true) => Some(LevelFilter::DEBUG),
            (None, false) => None,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the blocks related to a root block
    Related {
        /// Root block id
        root: i64,

        /// JSON dump of the block graph
        #[arg(short, long)]
        blocks: PathBuf,

        /// Keep only items whose searchable text contains this
        #[arg(short, long)]
        query: Option<String>,

        /// Keep only these categories (repeatable)
        #[arg(short = 'c', long = "category", value_parser = parse_category)]
        categories: Vec<RelationshipCategory>,

        /// Rendered tag-hierarchy breadcrumb of the root, e.g. "Work / Projects"
        #[arg(long)]
        breadcrumb: Option<String>,
    },

    /// List relationship categories in display order
    Categories,
}

fn parse_category(value: &str) -> Result<RelationshipCategory, String> {
    value.parse().map_err(|e: kinship_core::KinshipError| e.to_string())
}
