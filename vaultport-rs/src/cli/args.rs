//! CLI argument definitions using clap.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vaultport")]
#[command(author, version, about = "Convert knowledge-base exports into vault notes and query files", long_about = None)]
pub struct Cli {
    /// Path to a config file (defaults to <config_dir>/vaultport/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Output as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Evaluate relative date filters at this RFC 3339 instant instead of now
    #[arg(long, global = true)]
    pub now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }

    /// Default log filter for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print resolved front matter
    Frontmatter(FrontmatterArgs),

    /// Compile query objects into .base documents
    Compile(CompileArgs),

    /// Resolve a single property value
    Resolve(ResolveArgs),

    /// Write every object of a bundle into a vault directory
    Convert(ConvertArgs),
}

// === Frontmatter ===

#[derive(Parser, Debug)]
pub struct FrontmatterArgs {
    /// Path to the export bundle (JSON)
    pub bundle: PathBuf,

    /// Only this object (default: every object)
    #[arg(long)]
    pub object: Option<String>,
}

// === Compile ===

#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Path to the export bundle (JSON)
    pub bundle: PathBuf,

    /// Only this object (default: every query object)
    #[arg(long)]
    pub object: Option<String>,

    /// Print the .base file text instead of structured output
    #[arg(long, requires = "object")]
    pub raw: bool,
}

// === Resolve ===

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Path to the export bundle (JSON)
    pub bundle: PathBuf,

    /// Raw property key
    #[arg(long)]
    pub key: String,

    /// Raw value as JSON (e.g. '"opt-1"' or '["a","b"]')
    #[arg(long)]
    pub value: String,

    /// Treat the value as list-shaped even when it is a single item
    #[arg(long)]
    pub list: bool,
}

// === Convert ===

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Path to the export bundle (JSON)
    pub bundle: PathBuf,

    /// Output vault directory
    #[arg(long, short)]
    pub out: PathBuf,
}
